//! Version probe and the process-wide capability flag.
//!
//! The probe classifies the linked validation library into exactly one
//! [`Generation`]. The result of the first probe in a process is memoized and
//! never recomputed; later callers observe the same [`Capability`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::error::{CompatError, Result};
use crate::native;

/// Environment toggle read once by [`ProbeOptions::from_env`].
pub const OVERRIDE_ENV: &str = "MODELCOMPAT_GENERATION";

/// One of the two supported `jsonschema` API lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    /// Generation A: the 0.17 line (`JSONSchema::compile`).
    Legacy,
    /// Generation B: the 0.41 line (`validator_for`).
    Modern,
}

impl Generation {
    pub const ALL: [Generation; 2] = [Generation::Legacy, Generation::Modern];

    pub fn as_str(self) -> &'static str {
        match self {
            Generation::Legacy => "legacy",
            Generation::Modern => "modern",
        }
    }

    /// Stable slot index for per-generation caches.
    pub fn index(self) -> usize {
        match self {
            Generation::Legacy => 0,
            Generation::Modern => 1,
        }
    }

    /// Options with no native equivalent in this generation.
    pub fn gaps(self) -> &'static [CapabilityGap] {
        match self {
            Generation::Legacy => LEGACY_GAPS,
            Generation::Modern => MODERN_GAPS,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "legacy" | "1" | "v1" | "false" => Ok(Generation::Legacy),
            "b" | "modern" | "2" | "v2" | "true" => Ok(Generation::Modern),
            other => Err(format!("unknown generation {other:?} (expected a/legacy or b/modern)")),
        }
    }
}

/// How a documented option without a native equivalent is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapHandling {
    /// Enforced by the validation facade instead of the native line.
    Emulated,
    /// Accepted and deliberately ignored under every generation.
    NoOp,
}

impl GapHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emulated => "emulated",
            Self::NoOp => "no-op",
        }
    }
}

/// An enumerated difference between what a generation offers natively and
/// what the declaration surface documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityGap {
    pub option: &'static str,
    pub handling: GapHandling,
    pub note: &'static str,
}

const LEGACY_GAPS: &[CapabilityGap] = &[
    CapabilityGap {
        option: "strict",
        handling: GapHandling::Emulated,
        note: "coercion is disabled by the facade before native checks run",
    },
    CapabilityGap {
        option: "serializer",
        handling: GapHandling::Emulated,
        note: "model serializer hooks are applied by the facade on dump",
    },
    CapabilityGap {
        option: "arbitrary_types_allowed",
        handling: GapHandling::NoOp,
        note: "every declarable field type is JSON-representable",
    },
];

const MODERN_GAPS: &[CapabilityGap] = &[CapabilityGap {
    option: "arbitrary_types_allowed",
    handling: GapHandling::NoOp,
    note: "every declarable field type is JSON-representable",
}];

/// Where the active generation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    /// Chosen from the native entry points present in the build.
    Structural,
    /// Forced through [`ProbeOptions`].
    Override,
}

impl DetectionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Override => "override",
        }
    }
}

/// The immutable result of a version probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    generation: Generation,
    source: DetectionSource,
}

impl Capability {
    /// Probe with a forced generation, without touching the process-wide flag.
    pub fn forced(generation: Generation) -> Result<Self> {
        VersionProbe::new(ProbeOptions::forced(generation)).detect()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn source(&self) -> DetectionSource {
        self.source
    }

    pub fn is_modern(&self) -> bool {
        self.generation == Generation::Modern
    }

    pub fn gaps(&self) -> &'static [CapabilityGap] {
        self.generation.gaps()
    }
}

/// Initialization-time inputs to the probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Forces a generation, taking precedence over structural detection.
    pub generation: Option<Generation>,
}

impl ProbeOptions {
    pub fn forced(generation: Generation) -> Self {
        Self {
            generation: Some(generation),
        }
    }

    /// Read the override toggle from [`OVERRIDE_ENV`].
    pub fn from_env() -> Result<Self> {
        Self::from_value(std::env::var(OVERRIDE_ENV).ok().as_deref())
    }

    /// Parse a raw toggle value; an empty or missing value means no override.
    pub fn from_value(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(raw) => raw
                .parse::<Generation>()
                .map(Self::forced)
                .map_err(|_| CompatError::InvalidOverride {
                    var: OVERRIDE_ENV.to_string(),
                    value: raw.to_string(),
                }),
        }
    }
}

/// Classifies the linked validation library.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionProbe {
    options: ProbeOptions,
}

impl VersionProbe {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    /// Run detection. Prefers the modern line when both pass their shape check.
    pub fn detect(&self) -> Result<Capability> {
        let linked = native::linked();

        if let Some(forced) = self.options.generation {
            if !linked.contains(&forced) {
                return Err(CompatError::UnsupportedLibraryVersion(format!(
                    "generation {forced} was forced but its jsonschema line is not linked"
                )));
            }
            native::shape_check(forced).map_err(CompatError::UnsupportedLibraryVersion)?;
            info!(generation = %forced, "validation generation forced by override");
            return Ok(Capability {
                generation: forced,
                source: DetectionSource::Override,
            });
        }

        for candidate in [Generation::Modern, Generation::Legacy] {
            if !linked.contains(&candidate) {
                continue;
            }
            match native::shape_check(candidate) {
                Ok(()) => {
                    info!(generation = %candidate, "validation generation detected");
                    return Ok(Capability {
                        generation: candidate,
                        source: DetectionSource::Structural,
                    });
                }
                Err(reason) => debug!(generation = %candidate, %reason, "shape check failed"),
            }
        }

        Err(CompatError::UnsupportedLibraryVersion(format!(
            "no supported jsonschema API line found (linked: {})",
            describe(&linked)
        )))
    }
}

fn describe(lines: &[Generation]) -> String {
    if lines.is_empty() {
        return "none".to_string();
    }
    lines
        .iter()
        .map(|g| g.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generations whose native entry point is present in this build.
pub fn linked_generations() -> Vec<Generation> {
    native::linked()
}

static CAPABILITY: OnceLock<Result<Capability>> = OnceLock::new();

/// Initialize the process-wide flag with explicit options.
///
/// Only the first initialization in a process probes; later calls return the
/// memoized result and ignore their options.
pub fn init(options: ProbeOptions) -> Result<Capability> {
    let mut probed = false;
    let result = CAPABILITY
        .get_or_init(|| {
            probed = true;
            VersionProbe::new(options).detect()
        })
        .clone();

    if !probed {
        if let (Some(wanted), Ok(active)) = (options.generation, &result) {
            if wanted != active.generation() {
                warn!(
                    wanted = %wanted,
                    active = %active.generation(),
                    "capability already initialized; override ignored"
                );
            }
        }
    }
    result
}

/// The process-wide capability, probing with [`ProbeOptions::from_env`] on first use.
pub fn current() -> Result<Capability> {
    CAPABILITY
        .get_or_init(|| ProbeOptions::from_env().and_then(|options| VersionProbe::new(options).detect()))
        .clone()
}
