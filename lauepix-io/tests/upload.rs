use std::io::Write;

use lauepix_io::{encode_file, Error};
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_encode_file_keeps_bare_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("NaCl_run_1.nxs");
    std::fs::write(&path, [0u8, 1, 2, 255]).unwrap();

    let encoded = encode_file(&path).unwrap();
    assert_eq!(encoded.filename, "NaCl_run_1.nxs");
    assert_eq!(encoded.data_url, "data:application/octet-stream;base64,AAEC/w==");
}

#[test]
fn test_encode_temp_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"nexus").unwrap();
    file.flush().unwrap();

    let encoded = encode_file(file.path()).unwrap();
    assert!(encoded.data_url.ends_with("bmV4dXM="));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let result = encode_file(&dir.path().join("absent.nxs"));
    assert!(matches!(result, Err(Error::Io(_))));
}
