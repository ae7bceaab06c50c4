//! Version and build information

use std::fmt;

use crate::persona::PROFILE_SCHEMA_VERSION;

/// Build information embedded at compile time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub name: &'static str,
    /// Git commit hash (short)
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    git_dirty_str: &'static str,
    pub build_timestamp: &'static str,
    /// Target triple (e.g., x86_64-unknown-linux-gnu)
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    pub rustc_version: &'static str,
    /// Profile record schema this build reads and writes
    pub schema_version: u32,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            name: env!("CARGO_PKG_NAME"),
            git_hash: env!("NEXUS_GIT_HASH"),
            git_branch: env!("NEXUS_GIT_BRANCH"),
            git_dirty_str: env!("NEXUS_GIT_DIRTY"),
            build_timestamp: env!("NEXUS_BUILD_TIMESTAMP"),
            target: env!("NEXUS_TARGET"),
            profile: env!("NEXUS_BUILD_PROFILE"),
            rustc_version: env!("NEXUS_RUSTC_VERSION"),
            schema_version: PROFILE_SCHEMA_VERSION,
        }
    }

    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// Full version string (e.g., "0.1.0-abc1234")
    pub fn full_version(&self) -> String {
        if self.git_dirty() {
            format!("{}-{}-dirty", self.version, self.git_hash)
        } else {
            format!("{}-{}", self.version, self.git_hash)
        }
    }

    pub fn short_version(&self) -> String {
        format!("{} ({})", self.version, self.git_hash)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Version:        {}", self.version)?;
        writeln!(
            f,
            "  Git Hash:       {}{}",
            self.git_hash,
            if self.git_dirty() { " (dirty)" } else { "" }
        )?;
        writeln!(f, "  Git Branch:     {}", self.git_branch)?;
        writeln!(f, "  Built:          {}", self.build_timestamp)?;
        writeln!(f, "  Profile:        {}", self.profile)?;
        writeln!(f, "  Target:         {}", self.target)?;
        writeln!(f, "  Compiler:       {}", self.rustc_version)?;
        writeln!(f)?;
        writeln!(f, "Records:")?;
        writeln!(f, "  Profile schema: v{}", self.schema_version)?;
        Ok(())
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Print version information to stdout
pub fn print_version() {
    print!("{}", build_info());
}

pub fn print_short_version() {
    println!("{}", build_info().short_version());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_exists() {
        let info = build_info();
        assert!(!info.version.is_empty());
        assert_eq!(info.name, "nexus-hub");
    }

    #[test]
    fn test_full_version_contains_hash() {
        let info = build_info();
        let full = info.full_version();
        assert!(full.starts_with(info.version));
        assert!(full.contains(info.git_hash));
    }

    #[test]
    fn test_display_mentions_schema() {
        let display = build_info().to_string();
        assert!(display.contains("Git Hash:"));
        assert!(display.contains(&format!("Profile schema: v{}", PROFILE_SCHEMA_VERSION)));
    }
}
