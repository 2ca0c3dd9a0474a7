//! Registry of live driver-side GL objects.
//!
//! Every object-creating call registers the driver-assigned handle here;
//! every explicit delete unregisters it. Whatever is still registered
//! when a session shuts down gets released in one sweep, so GL resources
//! die deterministically even when the host never deleted them.

use std::collections::HashMap;

/// The six server-side object kinds a rendering context can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Framebuffer,
    Program,
    Renderbuffer,
    Shader,
    Texture,
}

impl ObjectKind {
    /// Lowercase label for log output.
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Buffer => "buffer",
            ObjectKind::Framebuffer => "framebuffer",
            ObjectKind::Program => "program",
            ObjectKind::Renderbuffer => "renderbuffer",
            ObjectKind::Shader => "shader",
            ObjectKind::Texture => "texture",
        }
    }
}

/// A live object: its kind plus the driver-assigned handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRecord {
    pub kind: ObjectKind,
    pub handle: u32,
}

/// Tracks created-but-not-yet-deleted GL objects, keyed by handle.
///
/// Handle uniqueness is the driver's guarantee, not ours; registering a
/// handle that is already present simply overwrites the old record.
/// Once [`begin_teardown`](ObjectRegistry::begin_teardown) has run, the
/// registry is frozen: further unregisters are silently ignored so a
/// late host finalizer cannot cause a double delete.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: HashMap<u32, ObjectKind>,
    tearing_down: bool,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly created object. Call immediately after the
    /// creation call succeeds.
    pub fn register(&mut self, kind: ObjectKind, handle: u32) {
        if self.tearing_down {
            return;
        }
        self.objects.insert(handle, kind);
    }

    /// Forgets the object with the given handle.
    ///
    /// Silently does nothing when the handle is unknown or teardown has
    /// begun -- teardown takes one-way ownership of releasing what is
    /// left, and an unregister racing it must not turn into an error or
    /// a double free.
    pub fn unregister(&mut self, handle: u32) {
        if self.tearing_down {
            return;
        }
        self.objects.remove(&handle);
    }

    /// Returns whether a record exists for the handle.
    pub fn contains(&self, handle: u32) -> bool {
        self.objects.contains_key(&handle)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns whether teardown has begun.
    pub fn is_tearing_down(&self) -> bool {
        self.tearing_down
    }

    /// Starts teardown: marks the registry frozen and drains every
    /// remaining record for the caller to release.
    ///
    /// The first call returns all live records (in unspecified order);
    /// every later call returns nothing. After this, `register` and
    /// `unregister` are no-ops.
    pub fn begin_teardown(&mut self) -> Vec<ObjectRecord> {
        if self.tearing_down {
            return Vec::new();
        }
        self.tearing_down = true;
        self.objects
            .drain()
            .map(|(handle, kind)| ObjectRecord { kind, handle })
            .collect()
    }
}
