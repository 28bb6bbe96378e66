//! Library-wide value types: namespaces, read preferences and write concerns.
use bson::{self, Bson};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Identifies a collection on the server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub db: String,
    pub coll: String,
}

impl Namespace {
    pub fn new(db: &str, coll: &str) -> Namespace {
        Namespace {
            db: db.to_owned(),
            coll: coll.to_owned(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{}", self.db, self.coll)
    }
}

/// Which members of a replica set may serve a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadMode {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl ReadMode {
    pub fn as_str(&self) -> &'static str {
        match *self {
            ReadMode::Primary => "primary",
            ReadMode::PrimaryPreferred => "primaryPreferred",
            ReadMode::Secondary => "secondary",
            ReadMode::SecondaryPreferred => "secondaryPreferred",
            ReadMode::Nearest => "nearest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadPreference {
    pub mode: ReadMode,
    pub tag_sets: Vec<BTreeMap<String, String>>,
}

impl ReadPreference {
    pub fn new(mode: ReadMode, tag_sets: Option<Vec<BTreeMap<String, String>>>) -> ReadPreference {
        ReadPreference {
            mode: mode,
            tag_sets: tag_sets.unwrap_or_else(Vec::new),
        }
    }

    pub fn primary() -> ReadPreference {
        ReadPreference::new(ReadMode::Primary, None)
    }

    /// The `$readPreference` document a transport attaches to routed reads.
    pub fn to_document(&self) -> bson::Document {
        let mut doc = doc! { "mode": self.mode.as_str() };

        if !self.tag_sets.is_empty() {
            let tags: Vec<Bson> = self.tag_sets
                .iter()
                .map(|set| {
                    let tag_doc = set.iter()
                        .map(|(k, v)| (k.to_owned(), Bson::String(v.to_owned())))
                        .collect::<bson::Document>();
                    Bson::Document(tag_doc)
                })
                .collect();
            doc.insert("tags", tags);
        }

        doc
    }
}

impl Default for ReadPreference {
    fn default() -> Self {
        ReadPreference::primary()
    }
}

/// The `w` component of a write concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Acknowledgment {
    /// Wait for the given number of nodes; `0` requests no acknowledgment.
    Nodes(i32),
    Majority,
    /// Wait for the members matching a custom getLastErrorModes tag.
    Tag(String),
}

impl From<Acknowledgment> for Bson {
    fn from(w: Acknowledgment) -> Bson {
        match w {
            Acknowledgment::Nodes(n) => Bson::I32(n),
            Acknowledgment::Majority => Bson::String(String::from("majority")),
            Acknowledgment::Tag(tag) => Bson::String(tag),
        }
    }
}

/// Durability requirements for writes. Unset fields defer to the server default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WriteConcern {
    pub w: Option<Acknowledgment>,
    // Only meaningful alongside `w`.
    pub w_timeout: Option<Duration>,
    pub journal: Option<bool>,
}

impl WriteConcern {
    pub fn new() -> WriteConcern {
        Default::default()
    }

    pub fn nodes(n: i32) -> WriteConcern {
        WriteConcern {
            w: Some(Acknowledgment::Nodes(n)),
            ..Default::default()
        }
    }

    pub fn majority() -> WriteConcern {
        WriteConcern {
            w: Some(Acknowledgment::Majority),
            ..Default::default()
        }
    }

    /// `w: 0` writes get no reply beyond `ok`, so no counts can be reported.
    pub fn is_acknowledged(&self) -> bool {
        match self.w {
            Some(Acknowledgment::Nodes(0)) => self.journal == Some(true),
            _ => true,
        }
    }

    /// Whether every field is unset, in which case no document is sent at all.
    pub fn is_server_default(&self) -> bool {
        self.w.is_none() && self.w_timeout.is_none() && self.journal.is_none()
    }

    pub fn to_bson(&self) -> bson::Document {
        let mut doc = bson::Document::new();

        if let Some(ref w) = self.w {
            doc.insert("w", Bson::from(w.clone()));
        }

        if let Some(timeout) = self.w_timeout {
            doc.insert("wtimeout", Bson::I64(timeout.as_millis() as i64));
        }

        if let Some(journal) = self.journal {
            doc.insert("j", journal);
        }

        doc
    }
}

/// Reads an integral reply field, which servers may encode as any numeric type.
pub fn get_integer(document: &bson::Document, key: &str) -> Option<i64> {
    match document.get(key) {
        Some(&Bson::I32(n)) => Some(n as i64),
        Some(&Bson::I64(n)) => Some(n),
        Some(&Bson::FloatingPoint(n)) if n.fract() == 0.0 => Some(n as i64),
        _ => None,
    }
}

/// Appends every field of `options` to `document`, keeping the document's order.
pub fn merge_options<T: Into<bson::Document>>(mut document: bson::Document,
                                              options: T)
                                              -> bson::Document {
    let options_doc: bson::Document = options.into();
    for (key, bson) in options_doc {
        document.insert(key, bson);
    }
    document
}
