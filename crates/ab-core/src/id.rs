use crate::model::ElementKind;
use lasso::{Spur, ThreadedRodeo};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

// ─── Id pool ─────────────────────────────────────────────────────────────

/// Process-wide pool backing all element ids. Two ids made from the
/// same string are the same handle, so equality and hashing never look
/// at the characters.
static POOL: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Serial counter for minted ids. Starts at 1 so the first rect is
/// `rect_1`, not `rect_0`.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Interned handle naming one element on the artboard.
///
/// Stable across re-parenting and z-order moves. Serializes as the
/// original string, so saved projects stay human-readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Spur);

impl ElementId {
    /// Looks up `raw` in the pool, adding it on first sight.
    pub fn intern(raw: &str) -> Self {
        ElementId(POOL.get_or_intern(raw))
    }

    /// Mints a fresh id for a newly placed element, named after its
    /// kind: `rect_1`, `chat_bubble_2`, and so on. Serials are shared
    /// across kinds, so minted ids never collide even when the kind
    /// name repeats.
    pub fn mint(kind: &ElementKind) -> Self {
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{}_{serial}", kind.name()))
    }

    /// The string this id was made from.
    pub fn as_str(&self) -> &str {
        POOL.resolve(&self.0)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementId").field(&self.as_str()).finish()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = ElementId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an element id string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(ElementId::intern(v))
            }
        }

        deserializer.deserialize_str(IdVisitor)
    }
}
