//! Export functionality: EML encoding, export filenames, and inspection.

pub mod eml;
pub mod filename;
pub mod inspect;
pub mod mime;

pub use eml::{mail_to_eml, mail_to_eml_file, write_eml, DataFile, BOUNDARY};
pub use filename::export_file_name;
