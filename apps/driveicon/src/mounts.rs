//! Mount table snapshot read from `/proc/self/mounts`.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const MOUNTS: &str = "/proc/self/mounts";

/// Which sources are mounted where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    by_source: HashMap<String, PathBuf>,
    targets: HashSet<PathBuf>,
}

impl MountTable {
    pub fn read() -> io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(MOUNTS)?))
    }

    /// Parses the `fstab`-style format. Malformed lines are skipped; for a
    /// source mounted twice the first mount wins.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let (Some(source), Some(target)) = (fields.next(), fields.next()) else {
                continue;
            };
            let target = PathBuf::from(unescape(target));
            table
                .by_source
                .entry(unescape(source))
                .or_insert_with(|| target.clone());
            table.targets.insert(target);
        }
        table
    }

    /// Where `device` is mounted. Falls back to `expected` when that path is
    /// a mount target, since some devices appear under another source name.
    pub fn mount_point(&self, device: &str, expected: Option<&Path>) -> Option<PathBuf> {
        if let Some(target) = self.by_source.get(device) {
            return Some(target.clone());
        }
        expected
            .filter(|path| self.targets.contains(*path))
            .map(Path::to_path_buf)
    }
}

/// Decodes the kernel's `\ooo` octal escapes (space, tab, newline, backslash).
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Some(code) = bytes.get(i + 1..i + 4).and_then(octal) {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn octal(digits: &[u8]) -> Option<u8> {
    digits.iter().try_fold(0u8, |acc, &digit| match digit {
        b'0'..=b'7' => acc.checked_mul(8)?.checked_add(digit - b'0'),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
/dev/sdb1 /run/media/me/My\\040Stick vfat rw,nosuid,nodev 0 0
/dev/sdb1 /mnt/again vfat rw 0 0
/dev/mapper/luks-1234 /media/backup ext4 rw 0 0
garbage
";

    #[test]
    fn parses_sources_and_targets() {
        let table = MountTable::parse(SAMPLE);
        assert_eq!(
            table.mount_point("/dev/nvme0n1p2", None),
            Some(PathBuf::from("/"))
        );
        assert_eq!(
            table.mount_point("/dev/sdb1", None),
            Some(PathBuf::from("/run/media/me/My Stick"))
        );
        assert_eq!(table.mount_point("/dev/sdc1", None), None);
    }

    #[test]
    fn expected_mount_point_is_a_fallback() {
        let table = MountTable::parse(SAMPLE);
        assert_eq!(
            table.mount_point("/dev/sdd1", Some(Path::new("/media/backup"))),
            Some(PathBuf::from("/media/backup"))
        );
        assert_eq!(
            table.mount_point("/dev/sdd1", Some(Path::new("/media/elsewhere"))),
            None
        );
    }

    #[test]
    fn unescape_octal_sequences() {
        assert_eq!(unescape(r"a\040b"), "a b");
        assert_eq!(unescape(r"tab\011end"), "tab\tend");
        assert_eq!(unescape(r"back\134slash"), "back\\slash");
        assert_eq!(unescape(r"short\04"), r"short\04");
        assert_eq!(unescape(r"not\999octal"), r"not\999octal");
    }

    #[test]
    fn empty_table() {
        let table = MountTable::parse("");
        assert_eq!(table, MountTable::default());
    }
}
