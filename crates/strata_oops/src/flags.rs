use std::{
    env::VarError,
    sync::atomic::{AtomicBool, Ordering},
};

static CHECK_UNHANDLED_OOPS: AtomicBool = AtomicBool::new(false);

/// Returns true if checked references register themselves with their thread's registry.
///
/// This is the runtime half of unhandled oop checking; the build-time half is the
/// `check-unhandled-oops` feature, which decides whether [`crate::Oop`] is a checked reference at
/// all.
pub fn check_unhandled_oops() -> bool {
    CHECK_UNHANDLED_OOPS.load(Ordering::Relaxed)
}

/// An error that occurs when reading [`VmFlags`] from the environment.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum FlagsError {
    /// The variable holds something other than a boolean
    #[error("invalid value '{value}' for {name}, expected one of: 1, 0, true, false")]
    InvalidBool {
        /// The name of the variable
        name: &'static str,
        /// The rejected value
        value: String,
    },
    /// The variable is not valid unicode
    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),
}

/// Runtime flags of the reference layer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VmFlags {
    check_unhandled_oops: bool,
}

impl VmFlags {
    /// The environment variable read by [`VmFlags::from_env`] to enable unhandled oop checking.
    pub const CHECK_UNHANDLED_OOPS_VAR: &'static str = "STRATA_CHECK_UNHANDLED_OOPS";

    /// Returns a builder starting from the default flags.
    pub fn builder() -> VmFlagsBuilder {
        VmFlagsBuilder {
            flags: VmFlags::default(),
        }
    }

    /// Reads the flags from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, FlagsError> {
        Self::from_vars(|name| std::env::var(name))
    }

    /// Reads the flags through `var`, which behaves like [`std::env::var`].
    pub fn from_vars(var: impl Fn(&str) -> Result<String, VarError>) -> Result<Self, FlagsError> {
        let mut flags = VmFlags::default();
        if let Some(value) = read_bool(&var, Self::CHECK_UNHANDLED_OOPS_VAR)? {
            flags.check_unhandled_oops = value;
        }
        Ok(flags)
    }

    /// Returns true if unhandled oop checking is requested.
    pub fn check_unhandled_oops(&self) -> bool {
        self.check_unhandled_oops
    }

    /// Publishes these flags to the whole process.
    pub fn install(&self) {
        CHECK_UNHANDLED_OOPS.store(self.check_unhandled_oops, Ordering::Relaxed);
        log::debug!("installed {self:?}");
    }
}

fn read_bool(
    var: &impl Fn(&str) -> Result<String, VarError>,
    name: &'static str,
) -> Result<Option<bool>, FlagsError> {
    match var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            _ => Err(FlagsError::InvalidBool { name, value }),
        },
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(FlagsError::NotUnicode(name)),
    }
}

/// Builds a [`VmFlags`].
pub struct VmFlagsBuilder {
    flags: VmFlags,
}

impl VmFlagsBuilder {
    /// Enables or disables unhandled oop checking.
    pub fn check_unhandled_oops(mut self, enabled: bool) -> Self {
        self.flags.check_unhandled_oops = enabled;
        self
    }

    /// Returns the built flags.
    pub fn build(self) -> VmFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::{FlagsError, VmFlags};
    use std::{env::VarError, ffi::OsString};

    #[test]
    fn defaults_when_unset() {
        let flags = VmFlags::from_vars(|_| Err(VarError::NotPresent)).unwrap();
        assert_eq!(flags, VmFlags::default());
        assert!(!flags.check_unhandled_oops());
    }

    #[test]
    fn parses_booleans() {
        for (value, expected) in [("1", true), ("TRUE", true), (" 0 ", false), ("false", false)] {
            let flags = VmFlags::from_vars(|_| Ok(value.to_owned())).unwrap();
            assert_eq!(flags.check_unhandled_oops(), expected, "value: {value:?}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            VmFlags::from_vars(|_| Ok("yes please".to_owned())),
            Err(FlagsError::InvalidBool {
                name: VmFlags::CHECK_UNHANDLED_OOPS_VAR,
                value: "yes please".to_owned()
            })
        );
        assert_eq!(
            VmFlags::from_vars(|_| Err(VarError::NotUnicode(OsString::new()))),
            Err(FlagsError::NotUnicode(VmFlags::CHECK_UNHANDLED_OOPS_VAR))
        );
    }

    #[test]
    fn builder() {
        let flags = VmFlags::builder().check_unhandled_oops(true).build();
        assert!(flags.check_unhandled_oops());
    }
}
