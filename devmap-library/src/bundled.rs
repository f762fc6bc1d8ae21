//! Default library compiled into the binary
//!
//! The `library/` directory of this crate is embedded with `include_dir` and
//! parsed on demand. It has the same layout [`load_dir`](crate::load_dir)
//! expects, so the files can be copied out and edited as a starting point.

use devmap_core::DeviceLibrary;
use include_dir::{include_dir, Dir};

use crate::document::{DeviceDoc, GenericDoc};
use crate::loader::{build, parse, DEVICE_DIR, GENERIC_FILE};
use crate::{LibraryError, LibraryResult};

static LIBRARY: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/library");

/// Parse the bundled default library
pub fn bundled() -> LibraryResult<DeviceLibrary> {
    let generic_file = LIBRARY
        .get_file(GENERIC_FILE)
        .ok_or_else(|| LibraryError::NotFound(GENERIC_FILE.to_string()))?;
    let generics: Vec<GenericDoc> = parse(GENERIC_FILE, utf8(generic_file)?)?;

    let device_dir = LIBRARY
        .get_dir(DEVICE_DIR)
        .ok_or_else(|| LibraryError::NotFound(DEVICE_DIR.to_string()))?;
    let mut files: Vec<_> = device_dir
        .files()
        .filter(|f| f.path().extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));

    let devices = files
        .into_iter()
        .map(|file| parse::<DeviceDoc>(&file.path().display().to_string(), utf8(file)?))
        .collect::<LibraryResult<Vec<_>>>()?;
    build(&generics, devices)
}

fn utf8<'a>(file: &'a include_dir::File<'_>) -> LibraryResult<&'a str> {
    file.contents_utf8().ok_or_else(|| LibraryError::Parse {
        document: file.path().display().to_string(),
        reason: "not UTF-8".to_string(),
    })
}
