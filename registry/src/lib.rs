//! Analysis half of the binding generator: a typed view over the binary
//! registry document plus the catalog built by walking it.

pub mod catalog;
pub mod deps;
pub mod doc;
pub mod encode;
pub mod names;
pub mod sort;

use catalog::Catalog;
use doc::Document;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open input {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: io::Error,
    },
    #[error("{}: truncated document header", path.display())]
    Header { path: PathBuf },
}

/// A loaded registry document.
#[derive(Debug)]
pub struct Registry {
    pub doc: Document,
}

impl Registry {
    pub fn load(path: impl AsRef<Path>) -> Result<Registry, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;
        if bytes.len() < doc::HEADER_LEN {
            return Err(Error::Header {
                path: path.to_owned(),
            });
        }
        debug!(path = %path.display(), len = bytes.len(), "loaded registry document");
        // The buffer is leaked so the document and every name view borrowed
        // from it can live for 'static, instead of threading a lifetime
        // through all the catalog tables.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        Ok(Registry {
            doc: Document::new(bytes),
        })
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.doc)
    }
}
