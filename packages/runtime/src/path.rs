//! Resource paths: immutable, composable addresses of remote resources.
//!
//! A path is a chain of segments linked to a shared parent. Composing a
//! path is pure; segments are never validated against a schema.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// A single argument of a service operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Json(serde_json::Value),
    Guid(Uuid),
}

impl ParameterValue {
    /// OData URL literal form.
    pub fn literal(&self) -> String {
        match self {
            ParameterValue::Guid(id) => format!("guid'{}'", id),
            ParameterValue::Json(serde_json::Value::Null) => "null".to_string(),
            ParameterValue::Json(serde_json::Value::Bool(b)) => b.to_string(),
            ParameterValue::Json(serde_json::Value::Number(n)) => n.to_string(),
            ParameterValue::Json(serde_json::Value::String(s)) => quote(s),
            ParameterValue::Json(other) => quote(&other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParameterValue::Guid(id) => serde_json::Value::String(id.to_string()),
            ParameterValue::Json(value) => value.clone(),
        }
    }
}

macro_rules! json_parameter {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParameterValue {
                fn from(value: $ty) -> Self {
                    ParameterValue::Json(value.into())
                }
            }
        )*
    };
}

json_parameter!(serde_json::Value, String, &str, bool, i32, i64, u32, u64, f64);

impl From<Uuid> for ParameterValue {
    fn from(id: Uuid) -> Self {
        ParameterValue::Guid(id)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", escape_url(&s.replace('\'', "''")))
}

/// Escape the characters that would otherwise end a URL path early.
fn escape_url(s: &str) -> String {
    s.replace('%', "%25").replace('#', "%23").replace('?', "%3F")
}

/// Ordered service-operation arguments.
///
/// Named arguments render as `name(a=1,b='x')`; positional ones as
/// `name('x')`. Insertion order is kept so rendered URLs are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(Option<String>, ParameterValue)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments, e.g. `GetByUrl('a.txt')`.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParameterValue>,
    {
        Self {
            entries: values.into_iter().map(|v| (None, v.into())).collect(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.entries.push((Some(name.into()), value.into()));
        self
    }

    #[must_use]
    pub fn with_guid(self, name: impl Into<String>, id: Uuid) -> Self {
        self.with(name, ParameterValue::Guid(id))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v)
    }

    /// JSON view: an object for named arguments, an array otherwise.
    pub fn to_json(&self) -> serde_json::Value {
        if self.entries.iter().all(|(name, _)| name.is_some()) {
            let map = self
                .entries
                .iter()
                .filter_map(|(name, value)| name.clone().map(|n| (n, value.to_json())))
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(map)
        } else {
            serde_json::Value::Array(self.entries.iter().map(|(_, v)| v.to_json()).collect())
        }
    }

    fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| match name {
                Some(name) => format!("{}={}", name, value.literal()),
                None => value.literal(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// One step of a resource path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A property or entity set name.
    Property(String),
    /// A collection item key, rendered as its own segment.
    Key(String),
    /// A service operation, with or without an argument list.
    Operation {
        name: String,
        parameters: Option<Parameters>,
    },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Property(name) => f.write_str(name),
            Segment::Key(key) => f.write_str(&escape_url(key).replace('/', "%2F")),
            Segment::Operation {
                name,
                parameters: None,
            } => f.write_str(name),
            Segment::Operation {
                name,
                parameters: Some(params),
            } => write!(f, "{}({})", name, params.render()),
        }
    }
}

#[derive(Debug)]
struct Node {
    segment: Segment,
    parent: Option<ResourcePath>,
}

/// Immutable address of a remote resource or operation.
///
/// Cloning is cheap; many paths share a parent.
#[derive(Clone)]
pub struct ResourcePath(Arc<Node>);

impl ResourcePath {
    /// Compose a path from an optional parent and a segment.
    pub fn combine(parent: Option<&ResourcePath>, segment: Segment) -> Self {
        ResourcePath(Arc::new(Node {
            segment,
            parent: parent.cloned(),
        }))
    }

    /// A root path with a single property segment.
    pub fn root(name: impl Into<String>) -> Self {
        Self::combine(None, Segment::Property(name.into()))
    }

    /// Build a chain of property segments from `a/b/c`. Empty segments
    /// are skipped; `None` if nothing remains.
    pub fn parse(s: &str) -> Option<Self> {
        s.split('/')
            .filter(|c| !c.is_empty())
            .fold(None, |parent: Option<ResourcePath>, name| {
                Some(Self::combine(
                    parent.as_ref(),
                    Segment::Property(name.to_string()),
                ))
            })
    }

    #[must_use]
    pub fn property(&self, name: impl Into<String>) -> Self {
        Self::combine(Some(self), Segment::Property(name.into()))
    }

    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        Self::combine(Some(self), Segment::Key(key.into()))
    }

    #[must_use]
    pub fn operation(&self, name: impl Into<String>, parameters: Option<Parameters>) -> Self {
        Self::combine(
            Some(self),
            Segment::Operation {
                name: name.into(),
                parameters,
            },
        )
    }

    pub fn segment(&self) -> &Segment {
        &self.0.segment
    }

    pub fn parent(&self) -> Option<&ResourcePath> {
        self.0.parent.as_ref()
    }

    /// Segments from the root down to this path.
    pub fn segments(&self) -> Vec<&Segment> {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(path) = current {
            segments.push(&path.0.segment);
            current = path.0.parent.as_ref();
        }
        segments.reverse();
        segments
    }

    pub fn len(&self) -> usize {
        let mut len = 0;
        let mut current = Some(self);
        while let Some(path) = current {
            len += 1;
            current = path.0.parent.as_ref();
        }
        len
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl PartialEq for ResourcePath {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.segments() == other.segments()
    }
}

impl Eq for ResourcePath {}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().into_iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourcePath({})", self)
    }
}
