use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

const INES_MAGIC: [u8; 4] = *b"NES\x1A";
const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;

pub const PRG_BANK_LEN: usize = 0x4000;
pub const CHR_BANK_LEN: usize = 0x2000;
pub const SRAM_LEN: usize = 0x2000;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("failed to open ROM file: {0}")]
    Open(#[from] io::Error),
    #[error("not an iNES file (bad magic)")]
    BadMagic,
    #[error("iNES header truncated")]
    TruncatedHeader,
    #[error("ROM image truncated: expected {expected} bytes after the header, got {actual}")]
    TruncatedBody { expected: usize, actual: usize },
    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u8),
}

/// Nametable arrangement. Horizontal/Vertical come from the header; MMC1,
/// MMC3 and AxROM rewrite this at runtime through their control registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    Single0,
    Single1,
    Four,
}

impl Mirroring {
    pub(crate) fn index(self) -> usize {
        match self {
            Mirroring::Horizontal => 0,
            Mirroring::Vertical => 1,
            Mirroring::Single0 => 2,
            Mirroring::Single1 => 3,
            Mirroring::Four => 4,
        }
    }
}

pub struct Cartridge {
    /// PRG-ROM, a multiple of 16 KiB.
    pub prg: Vec<u8>,
    /// CHR-ROM, a multiple of 8 KiB. When the header declares no CHR banks
    /// this is 8 KiB of writable CHR-RAM instead.
    pub chr: Vec<u8>,
    /// 8 KiB of PRG-RAM at $6000-$7FFF, persisted when battery-backed.
    pub sram: Vec<u8>,
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    save_path: Option<PathBuf>,
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Result<Self, RomError> {
        if data.len() < INES_MAGIC.len() {
            return Err(RomError::TruncatedHeader);
        }
        if data[..4] != INES_MAGIC {
            return Err(RomError::BadMagic);
        }
        if data.len() < HEADER_LEN {
            return Err(RomError::TruncatedHeader);
        }
        Ok(Self { data })
    }

    fn prg_banks(&self) -> usize {
        self.data[4] as usize
    }

    fn chr_banks(&self) -> usize {
        self.data[5] as usize
    }

    fn mapper_id(&self) -> u8 {
        (self.data[6] >> 4) | (self.data[7] & 0xF0)
    }

    fn mirroring(&self) -> Mirroring {
        if self.data[6] & 0x08 != 0 {
            Mirroring::Four
        } else if self.data[6] & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    fn battery(&self) -> bool {
        self.data[6] & 0x02 != 0
    }

    fn trainer(&self) -> bool {
        self.data[6] & 0x04 != 0
    }
}

impl Cartridge {
    /// Parse an iNES v1 image from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RomError> {
        let header = Header::parse(data)?;

        let prg_len = header.prg_banks() * PRG_BANK_LEN;
        let chr_len = header.chr_banks() * CHR_BANK_LEN;
        // A 512-byte trainer, when present, sits between the header and
        // PRG-ROM. Nothing in the core uses it.
        let trainer_len = if header.trainer() { TRAINER_LEN } else { 0 };

        let body = &data[HEADER_LEN..];
        let expected = trainer_len + prg_len + chr_len;
        if body.len() < expected {
            return Err(RomError::TruncatedBody {
                expected,
                actual: body.len(),
            });
        }

        let prg_start = trainer_len;
        let prg = body[prg_start..prg_start + prg_len].to_vec();
        let chr = if chr_len == 0 {
            // No CHR-ROM: the board carries 8 KiB of CHR-RAM instead.
            vec![0; CHR_BANK_LEN]
        } else {
            body[prg_start + prg_len..prg_start + prg_len + chr_len].to_vec()
        };

        Ok(Self {
            prg,
            chr,
            sram: vec![0; SRAM_LEN],
            mapper_id: header.mapper_id(),
            mirroring: header.mirroring(),
            battery: header.battery(),
            save_path: None,
        })
    }

    /// Load a ROM from disk. For battery-backed boards this also attempts to
    /// restore SRAM from the `<rom>.srm` sidecar; a missing or short save
    /// file is not an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let data = fs::read(&path)?;
        let mut cart = Self::from_bytes(&data)?;

        if cart.battery {
            let save = sram_path(path.as_ref());
            match fs::read(&save) {
                Ok(bytes) => {
                    for (d, s) in cart.sram.iter_mut().zip(bytes.iter()) {
                        *d = *s;
                    }
                }
                Err(e) => {
                    core_warn!(target: "cartridge",
                        "no SRAM restored from {}: {e}", save.display());
                }
            }
            cart.save_path = Some(save);
        }

        core_info!(target: "cartridge",
            "loaded ROM: mapper {}, {} KiB PRG, {} KiB CHR{}",
            cart.mapper_id,
            cart.prg.len() / 1024,
            cart.chr.len() / 1024,
            if cart.battery { ", battery" } else { "" });
        Ok(cart)
    }

    /// Write SRAM back to the save sidecar. Call on clean shutdown.
    pub fn save_sram(&self) -> io::Result<()> {
        if let (true, Some(path)) = (self.battery, &self.save_path) {
            fs::write(path, &self.sram)?;
        }
        Ok(())
    }
}

fn sram_path(rom: &Path) -> PathBuf {
    let mut os = rom.as_os_str().to_os_string();
    os.push(".srm");
    PathBuf::from(os)
}
