//! Program images on disk.
use std::{fs, path::Path};

use chip8::prelude::*;

/// Raw program image loaded from storage.
pub struct Rom {
    /// File name without the directory.
    pub name: String,
    pub data: Vec<u8>,
}

impl Rom {
    pub fn from_file(path: impl AsRef<Path>) -> Chip8Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self { name, data })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rom_from_file() {
        let path = std::env::temp_dir().join(format!("chip8-test-{}.rom", std::process::id()));
        fs::write(&path, [0x60, 0x05, 0x70, 0x03]).unwrap();

        let rom = Rom::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(rom.name, path.file_name().unwrap().to_string_lossy());
        assert_eq!(rom.data, vec![0x60, 0x05, 0x70, 0x03]);
    }

    #[test]
    fn test_missing_rom() {
        let result = Rom::from_file("does/not/exist.rom");
        assert!(matches!(result, Err(Chip8Error::Io(_))));
    }
}
