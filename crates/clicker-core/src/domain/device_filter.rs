//! Hardware-identity allow-list.
//!
//! Only devices whose hardware identity string starts with one of the
//! operator's allow-listed prefixes are considered for interception.  Every
//! other keyboard (including the one the presenter types on) is passed
//! through untouched.
//!
//! Matching is ordinal and case-sensitive: `HID\VID_046D` does not match
//! `hid\vid_046d`.  No trimming or other normalisation is applied to either
//! side of the comparison.

/// Prefix written to a freshly created allow-list file (Logitech R400/R500
/// class presenters).
pub const DEFAULT_DEVICE_PREFIX: &str = "HID\\VID_046D&PID_C540";

/// Returns `true` iff `identity` starts with any entry of `allowlist`.
pub fn allowed<S: AsRef<str>>(identity: &str, allowlist: &[S]) -> bool {
    allowlist
        .iter()
        .any(|prefix| identity.as_bytes().starts_with(prefix.as_ref().as_bytes()))
}

/// Ordered, read-only list of hardware-identity prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceAllowList {
    prefixes: Vec<String>,
}

impl DeviceAllowList {
    /// Builds an allow-list from explicit prefixes, in order.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// The single-entry list used on first run.
    pub fn with_default_entry() -> Self {
        Self::new([DEFAULT_DEVICE_PREFIX])
    }

    /// Parses the plain-text file format: one prefix per line.
    ///
    /// Line terminators are stripped.  Blank lines and lines starting with
    /// `#` are skipped, since an empty prefix would match every device.
    pub fn parse(contents: &str) -> Self {
        Self {
            prefixes: contents
                .lines()
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Renders the list in the file format accepted by [`parse`](Self::parse).
    pub fn to_file_contents(&self) -> String {
        let mut out = String::new();
        for prefix in &self.prefixes {
            out.push_str(prefix);
            out.push('\n');
        }
        out
    }

    /// Returns `true` if `identity` matches any prefix.
    pub fn allows(&self, identity: &str) -> bool {
        allowed(identity, &self.prefixes)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
