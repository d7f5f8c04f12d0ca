use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{KenshoError, Result, SoundId};

/// Where the ambient loop for one channel lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSource {
    pub id: SoundId,
    pub path: PathBuf,
}

/// Registry of the ambient sources backing each channel.
#[derive(Debug, Default)]
pub struct SoundLibrary {
    sources: HashMap<SoundId, SoundSource>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    pub fn from_sources(sources: &[SoundSource]) -> Self {
        let mut library = Self::new();
        for source in sources {
            library.register(source.clone());
        }
        library
    }

    /// Registers a source, replacing any previous one for the same channel.
    pub fn register(&mut self, source: SoundSource) {
        self.sources.insert(source.id, source);
    }

    pub fn source(&self, id: SoundId) -> Option<&SoundSource> {
        self.sources.get(&id)
    }

    /// Checks that the channel has a source and that it can be opened.
    pub fn resolve(&self, id: SoundId) -> Result<&Path> {
        let source = self
            .sources
            .get(&id)
            .ok_or(KenshoError::ChannelUnavailable(id))?;
        if source.path.is_file() {
            Ok(&source.path)
        } else {
            Err(KenshoError::ChannelUnavailable(id))
        }
    }

    /// Registered channels whose source cannot be found, in channel order.
    pub fn missing(&self) -> Vec<SoundId> {
        SoundId::ALL
            .into_iter()
            .filter(|id| self.sources.contains_key(id) && self.resolve(*id).is_err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn source(id: SoundId, path: impl Into<PathBuf>) -> SoundSource {
        SoundSource {
            id,
            path: path.into(),
        }
    }

    #[test]
    fn resolves_registered_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rain.mp3");
        std::fs::write(&path, b"ID3").unwrap();

        let library = SoundLibrary::from_sources(&[source(SoundId::Rain, &path)]);
        assert_eq!(library.resolve(SoundId::Rain).unwrap(), path.as_path());
        assert!(library.missing().is_empty());
    }

    #[test]
    fn reports_missing_sources() {
        let mut library = SoundLibrary::new();
        library.register(source(SoundId::Forest, "/nonexistent/forest.mp3"));

        let err = library.resolve(SoundId::Forest).unwrap_err();
        assert!(format!("{err}").contains("forest"));
        assert!(matches!(
            library.resolve(SoundId::Waves),
            Err(KenshoError::ChannelUnavailable(SoundId::Waves))
        ));
        assert_eq!(library.missing(), vec![SoundId::Forest]);
    }
}
