use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: u32,
    pub name: String,
    /// Name as announced by the station's ICY metadata, when it differs.
    #[serde(default)]
    pub short_name: String,
    pub url: String,
}

impl Stream {
    pub fn new(id: u32, name: &str, short_name: &str, url: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            short_name: short_name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Fixed id → stream mapping, read-only at run time.  Iterates in id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Stream>", into = "Vec<Stream>")]
pub struct Catalog {
    streams: BTreeMap<u32, Stream>,
}

impl TryFrom<Vec<Stream>> for Catalog {
    type Error = String;

    fn try_from(list: Vec<Stream>) -> Result<Self, Self::Error> {
        let mut streams = BTreeMap::new();
        for stream in list {
            if stream.id == 0 {
                return Err(format!("stream '{}' has id 0; ids start at 1", stream.name));
            }
            if stream.url.trim().is_empty() {
                return Err(format!("stream {} has an empty url", stream.id));
            }
            let id = stream.id;
            if streams.insert(id, stream).is_some() {
                return Err(format!("duplicate stream id {id}"));
            }
        }
        Ok(Self { streams })
    }
}

impl From<Catalog> for Vec<Stream> {
    fn from(catalog: Catalog) -> Self {
        catalog.streams.into_values().collect()
    }
}

impl Catalog {
    pub fn get(&self, id: u32) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    pub fn find_by_url(&self, url: &str) -> Option<&Stream> {
        self.streams.values().find(|s| s.url == url)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Digits of the largest id, for right-aligning the menu numbers.
    pub fn id_width(&self) -> usize {
        self.streams
            .keys()
            .next_back()
            .map_or(1, |id| id.to_string().len())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        // the built-in list only has unique, non-zero ids
        Self {
            streams: default_streams().into_iter().map(|s| (s.id, s)).collect(),
        }
    }
}

fn default_streams() -> Vec<Stream> {
    vec![
        Stream::new(1, "Русские Песни", "RUSSIAN SONGS", "https://listen.rusongs.ru:8005/ru-mp3-128"),
        Stream::new(2, "Nebenwelten", "Nebenwelten", "https://stream.laut.fm/nebenwelten"),
        Stream::new(3, "Goa Base", "Goa Base", "https://goa-base.stream.laut.fm/goa-base"),
        Stream::new(4, "Hohenburg", "Radiohohenburg", "https://stream.laut.fm/radiohohenburg"),
        Stream::new(5, "SynthWay", "SynthWay Radio", "https://c24.radioboss.fm:18014/stream"),
        Stream::new(
            6,
            "Зайцев ФМ",
            "zaycev.fm (metal mp3 stream 256kb)",
            "https://zaycevfm.cdnvideo.ru/ZaycevFM_metal_256.mp3",
        ),
        Stream::new(7, "7 Rays", "7 Rays", "https://7rays.stream.laut.fm/7rays"),
        Stream::new(8, "Ancient FM", "Ancient FM", "https://mediaserv73.live-streams.nl:18058/stream"),
        Stream::new(9, "Enigmatic Station", "Enigmatic robot", "https://myradio24.org/8226"),
        Stream::new(10, "Fly FM", "Radio FLYFM", "http://flyfm.net:8000/flyfm"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_sorted() {
        let catalog = Catalog::default();
        let ids: Vec<u32> = catalog.iter().map(|s| s.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(catalog.id_width(), 2);
        assert_eq!(
            catalog.find_by_url("http://flyfm.net:8000/flyfm").map(|s| s.id),
            Some(10)
        );
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = Catalog::try_from(vec![
            Stream::new(1, "a", "", "http://a/x"),
            Stream::new(1, "b", "", "http://b/x"),
        ])
        .unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_rejects_zero_id() {
        assert!(Catalog::try_from(vec![Stream::new(0, "a", "", "http://a/x")]).is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            streams: Catalog,
        }
        let doc: Doc = toml::from_str(
            r#"
            [[streams]]
            id = 7
            name = "Seven"
            url = "https://example.com/seven"

            [[streams]]
            id = 2
            name = "Two"
            short_name = "TWO FM"
            url = "https://example.com/two"
            "#,
        )
        .unwrap();
        let names: Vec<&str> = doc.streams.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Two", "Seven"]);
        assert_eq!(doc.streams.get(2).unwrap().short_name, "TWO FM");
        assert!(doc.streams.get(3).is_none());
    }
}
