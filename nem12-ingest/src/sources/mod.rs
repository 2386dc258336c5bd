pub mod nem12_file;

pub use nem12_file::Nem12FileSource;
