//! iNES cartridge loading and routing.

use crate::mapper::{self, Mapped, Mapper};

const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;
const PRG_BANK: usize = 16 * 1024;
const CHR_BANK: usize = 8 * 1024;
const PRG_RAM_LEN: usize = 8 * 1024;
const CHR_RAM_LEN: usize = 8 * 1024;

/// Nametable mirroring imposed by the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLower,
    OneScreenUpper,
    FourScreen,
}

/// A loaded cartridge: the PRG/CHR/PRG-RAM byte arrays plus the mapper
/// that routes accesses into them. Created on insertion, dropped on
/// removal; CHR is writable only when the header declared CHR RAM.
pub struct Cartridge {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mapper: Box<dyn Mapper>,
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("prg_rom_len", &self.prg_rom.len())
            .field("prg_ram_len", &self.prg_ram.len())
            .field("chr_len", &self.chr.len())
            .field("chr_is_ram", &self.chr_is_ram)
            .finish()
    }
}

impl Cartridge {
    /// Parse an iNES image.
    ///
    /// # Errors
    ///
    /// Rejects a missing `NES\x1A` magic, NES 2.0 images, truncated
    /// bodies, and unsupported mapper numbers.
    pub fn from_ines(data: &[u8]) -> Result<Self, String> {
        if data.len() < HEADER_LEN {
            return Err("invalid/truncated iNES image: no header".into());
        }
        if &data[0..4] != b"NES\x1a" {
            return Err("invalid iNES image: bad magic".into());
        }

        let prg_banks = data[4] as usize;
        let chr_banks = data[5] as usize;
        let flags6 = data[6];
        let flags7 = data[7];

        if flags7 & 0x0C == 0x08 {
            return Err("NES 2.0 images are not supported".into());
        }

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let has_trainer = flags6 & 0x04 != 0;
        let mapper_id = (flags6 >> 4) | (flags7 & 0xF0);

        let prg_len = prg_banks * PRG_BANK;
        let chr_len = chr_banks * CHR_BANK;
        let prg_start = HEADER_LEN + if has_trainer { TRAINER_LEN } else { 0 };
        let chr_start = prg_start + prg_len;

        if data.len() < chr_start + chr_len {
            return Err(format!(
                "invalid/truncated iNES image: expected {} bytes, got {}",
                chr_start + chr_len,
                data.len()
            ));
        }

        let prg_rom = data[prg_start..prg_start + prg_len].to_vec();
        let (chr, chr_is_ram) = if chr_len > 0 {
            (data[chr_start..chr_start + chr_len].to_vec(), false)
        } else {
            (vec![0; CHR_RAM_LEN], true)
        };

        let mapper = mapper::create(mapper_id, prg_rom.len(), chr.len(), mirroring)?;

        Ok(Self {
            prg_rom,
            prg_ram: vec![0; PRG_RAM_LEN],
            chr,
            chr_is_ram,
            mapper,
        })
    }

    /// iNES mapper number of the loaded board.
    #[must_use]
    pub fn mapper_id(&self) -> u8 {
        self.mapper.id()
    }

    /// Current nametable mirroring.
    #[must_use]
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    /// Reset mapper state (console reset keeps the cartridge alive).
    pub fn reset(&mut self) {
        self.mapper.reset();
    }

    /// CPU read; `None` means the cartridge does not claim the address.
    #[must_use]
    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        match self.mapper.cpu_read(addr) {
            Mapped::None => None,
            Mapped::Zero => Some(0),
            Mapped::Rom(offset) => Some(self.prg_rom[offset % self.prg_rom.len().max(1)]),
            Mapped::Ram(offset) => Some(self.prg_ram[offset % self.prg_ram.len()]),
        }
    }

    /// CPU write; returns whether the cartridge claimed the address.
    pub fn cpu_write(&mut self, addr: u16, value: u8) -> bool {
        match self.mapper.cpu_write(addr, value) {
            Mapped::None => false,
            Mapped::Zero | Mapped::Rom(_) => true,
            Mapped::Ram(offset) => {
                let len = self.prg_ram.len();
                self.prg_ram[offset % len] = value;
                true
            }
        }
    }

    /// PPU pattern-table read through the mapper.
    #[must_use]
    pub fn chr_read(&self, addr: u16) -> u8 {
        let offset = self.mapper.chr_offset(addr);
        self.chr[offset % self.chr.len()]
    }

    /// PPU pattern-table write; ignored for CHR ROM.
    pub fn chr_write(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            let offset = self.mapper.chr_offset(addr) % self.chr.len();
            self.chr[offset] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ines(mapper: u8, prg_banks: u8, chr_banks: u8, flags6_low: u8) -> Vec<u8> {
        let prg_len = prg_banks as usize * PRG_BANK;
        let chr_len = chr_banks as usize * CHR_BANK;
        let mut data = vec![0u8; HEADER_LEN + prg_len + chr_len];
        data[0..4].copy_from_slice(b"NES\x1a");
        data[4] = prg_banks;
        data[5] = chr_banks;
        data[6] = (mapper << 4) | flags6_low;
        data[7] = mapper & 0xF0;
        for i in 0..prg_len {
            data[HEADER_LEN + i] = (i & 0xFF) as u8;
        }
        for i in 0..chr_len {
            data[HEADER_LEN + prg_len + i] = ((i ^ 0x55) & 0xFF) as u8;
        }
        data
    }

    #[test]
    fn rejects_bad_magic() {
        let data = vec![0u8; 64];
        assert!(Cartridge::from_ines(&data).is_err());
    }

    #[test]
    fn rejects_nes2_images() {
        let mut data = build_ines(0, 1, 1, 0);
        data[7] |= 0x08;
        let err = Cartridge::from_ines(&data).unwrap_err();
        assert!(err.contains("NES 2.0"));
    }

    #[test]
    fn rejects_truncated_body() {
        let mut data = build_ines(0, 2, 1, 0);
        data.truncate(data.len() - 1);
        let err = Cartridge::from_ines(&data).unwrap_err();
        assert!(err.contains("truncated"));
    }

    #[test]
    fn rejects_unsupported_mapper() {
        let data = build_ines(9, 1, 1, 0);
        assert!(Cartridge::from_ines(&data).is_err());
    }

    #[test]
    fn trainer_offsets_prg_rom() {
        let mut data = build_ines(0, 1, 0, 0x04);
        // Insert 512 trainer bytes between header and PRG.
        let trainer = vec![0xEE; TRAINER_LEN];
        data.splice(HEADER_LEN..HEADER_LEN, trainer);
        let cart = Cartridge::from_ines(&data).unwrap();
        // PRG byte 0 is still 0x00, not trainer filler.
        assert_eq!(cart.cpu_read(0x8000), Some(0x00));
    }

    #[test]
    fn header_mirroring_bit() {
        let cart = Cartridge::from_ines(&build_ines(0, 1, 1, 0x01)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::Vertical);
        let cart = Cartridge::from_ines(&build_ines(0, 1, 1, 0x00)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::Horizontal);
        let cart = Cartridge::from_ines(&build_ines(0, 1, 1, 0x08)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::FourScreen);
    }

    #[test]
    fn chr_ram_when_header_declares_zero_banks() {
        let mut cart = Cartridge::from_ines(&build_ines(0, 1, 0, 0)).unwrap();
        cart.chr_write(0x0123, 0xAB);
        assert_eq!(cart.chr_read(0x0123), 0xAB);
    }

    #[test]
    fn chr_rom_is_read_only() {
        let mut cart = Cartridge::from_ines(&build_ines(0, 1, 1, 0)).unwrap();
        let before = cart.chr_read(0x0123);
        cart.chr_write(0x0123, before.wrapping_add(1));
        assert_eq!(cart.chr_read(0x0123), before);
    }

    #[test]
    fn prg_ram_round_trips() {
        let mut cart = Cartridge::from_ines(&build_ines(0, 1, 1, 0)).unwrap();
        assert!(cart.cpu_write(0x6000, 0x42));
        assert_eq!(cart.cpu_read(0x6000), Some(0x42));
        assert!(cart.cpu_write(0x7FFF, 0x99));
        assert_eq!(cart.cpu_read(0x7FFF), Some(0x99));
    }

    #[test]
    fn addresses_below_prg_ram_are_not_claimed() {
        let cart = Cartridge::from_ines(&build_ines(0, 1, 1, 0)).unwrap();
        assert_eq!(cart.cpu_read(0x4020), None);
        assert_eq!(cart.cpu_read(0x5FFF), None);
    }
}
