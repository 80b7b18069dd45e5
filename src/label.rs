//! Hostname to DNS wire-label encoding.
//!
//! The CNAME target is the local host's `.local` name in uncompressed DNS
//! wire form:
//!
//! ```text
//! "myhost" + ".local"
//!   → \x06 m y h o s t \x05 l o c a l \x00
//! ```

use std::fmt;
use std::io;

use tracing::warn;

/// Maximum length of an encoded DNS name, root label included.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// A DNS name in length-prefixed wire form, terminated by the root label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHostname(Vec<u8>);

impl EncodedHostname {
    /// Encode `"." + hostname + suffix` into wire form.
    ///
    /// Empty labels are skipped, so an empty hostname encodes just the
    /// suffix. Labels longer than [`MAX_LABEL_LEN`] are truncated. When the
    /// name would exceed [`MAX_NAME_LEN`], trailing hostname labels are
    /// dropped so the suffix labels survive.
    pub fn encode(hostname: &str, suffix: &str) -> Self {
        let dotted = format!(".{hostname}{suffix}");
        let labels: Vec<&[u8]> = dotted
            .split('.')
            .filter(|l| !l.is_empty())
            .map(|l| &l.as_bytes()[..l.len().min(MAX_LABEL_LEN)])
            .collect();

        // A suffix without a leading dot merges its first label into the
        // hostname's last one.
        let tail = suffix
            .split('.')
            .skip(1)
            .filter(|l| !l.is_empty())
            .count()
            .min(labels.len());
        let (host_labels, suffix_labels) = labels.split_at(labels.len() - tail);

        // Everything except the root terminator.
        let limit = MAX_NAME_LEN - 1;
        let suffix_len: usize = suffix_labels.iter().map(|l| 1 + l.len()).sum();
        let host_limit = limit.saturating_sub(suffix_len);

        let mut out = Vec::with_capacity(dotted.len() + 1);
        let mut truncated = false;
        for label in host_labels {
            if out.len() + 1 + label.len() > host_limit {
                truncated = true;
                break;
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        for label in suffix_labels {
            if out.len() + 1 + label.len() > limit {
                truncated = true;
                break;
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        if truncated {
            warn!(hostname, suffix, "encoded hostname truncated");
        }

        out.push(0);
        Self(out)
    }

    /// The raw wire bytes, root label included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of wire bytes, root label included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the name is only the root label.
    pub fn is_empty(&self) -> bool {
        self.0.len() <= 1
    }

    /// Iterate the labels, without their length bytes.
    pub fn labels(&self) -> Labels<'_> {
        Labels { rest: &self.0 }
    }
}

impl fmt::Display for EncodedHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.labels().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&String::from_utf8_lossy(label))?;
        }
        Ok(())
    }
}

/// Iterator over the labels of an [`EncodedHostname`].
#[derive(Debug, Clone)]
pub struct Labels<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, tail) = self.rest.split_first()?;
        let len = usize::from(len);
        if len == 0 || len > tail.len() {
            self.rest = &[];
            return None;
        }
        let (label, rest) = tail.split_at(len);
        self.rest = rest;
        Some(label)
    }
}

/// Source of the local hostname.
pub trait HostnameSource: Send {
    /// Query the current hostname.
    fn hostname(&self) -> io::Result<String>;
}

/// Hostname as reported by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostname;

impl HostnameSource for SystemHostname {
    fn hostname(&self) -> io::Result<String> {
        Ok(hostname::get()?.to_string_lossy().into_owned())
    }
}

/// Query `source` and encode the result, falling back to an empty hostname.
pub fn encode_local_hostname(source: &dyn HostnameSource, suffix: &str) -> EncodedHostname {
    let hostname = source.hostname().unwrap_or_else(|e| {
        warn!(error = %e, "gethostname failed, publishing under the bare suffix");
        String::new()
    });
    EncodedHostname::encode(&hostname, suffix)
}
