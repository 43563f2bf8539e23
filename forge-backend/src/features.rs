//! CPU Feature Gates
//!
//! Optional instruction-set capabilities a backend consults before choosing
//! between a native instruction and an emulation sequence. Every lowering
//! that depends on a feature must have an emulated fallback, so any CPU
//! model yields correct code.

/// Optional capability a CPU model may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Conditional register select (`isel`)
    PredicatedSelect,
    /// Hardware population count (`popcntd`)
    PopulationCount,
    /// Byte-reverse instructions (`brd`/`brw`)
    ByteSwap,
    /// Per-byte compare (`cmpb`)
    ByteCompare,
    /// Floating-point copy-sign (`fcpsgn`)
    FloatCopySign,
}

/// Answers "does the selected CPU have this capability?"
pub trait FeatureGate {
    fn has(&self, feature: Feature) -> bool;
}

/// PowerPC CPU models the backend can tune for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CpuModel {
    /// Baseline 64-bit PowerPC; no optional features
    Generic,
    Power4,
    Power5,
    Power6,
    Power7,
    Power8,
    Power9,
}

impl CpuModel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "generic" => Some(CpuModel::Generic),
            "power4" => Some(CpuModel::Power4),
            "power5" => Some(CpuModel::Power5),
            "power6" => Some(CpuModel::Power6),
            "power7" => Some(CpuModel::Power7),
            "power8" => Some(CpuModel::Power8),
            "power9" => Some(CpuModel::Power9),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CpuModel::Generic => "generic",
            CpuModel::Power4 => "power4",
            CpuModel::Power5 => "power5",
            CpuModel::Power6 => "power6",
            CpuModel::Power7 => "power7",
            CpuModel::Power8 => "power8",
            CpuModel::Power9 => "power9",
        }
    }
}

/// Feature set resolved from a PowerPC CPU model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ppc64Features {
    pub isel: bool,
    pub popcntd: bool,
    pub byte_reverse: bool,
    pub cmpb: bool,
    pub fcpsgn: bool,
}

impl Ppc64Features {
    pub fn for_model(model: CpuModel) -> Self {
        Self {
            isel: model >= CpuModel::Power5,
            cmpb: model >= CpuModel::Power6,
            fcpsgn: model >= CpuModel::Power6,
            popcntd: model >= CpuModel::Power7,
            byte_reverse: model >= CpuModel::Power9,
        }
    }

    /// All features on; exercises every native path in tests
    pub fn all() -> Self {
        Self {
            isel: true,
            popcntd: true,
            byte_reverse: true,
            cmpb: true,
            fcpsgn: true,
        }
    }

    /// All features off; exercises every emulation path in tests
    pub fn none() -> Self {
        Self {
            isel: false,
            popcntd: false,
            byte_reverse: false,
            cmpb: false,
            fcpsgn: false,
        }
    }
}

impl FeatureGate for Ppc64Features {
    fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::PredicatedSelect => self.isel,
            Feature::PopulationCount => self.popcntd,
            Feature::ByteSwap => self.byte_reverse,
            Feature::ByteCompare => self.cmpb,
            Feature::FloatCopySign => self.fcpsgn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_has_no_features() {
        let f = Ppc64Features::for_model(CpuModel::Generic);
        assert_eq!(f, Ppc64Features::none());
    }

    #[test]
    fn test_feature_introduction_order() {
        let p4 = Ppc64Features::for_model(CpuModel::Power4);
        assert!(!p4.isel);

        let p5 = Ppc64Features::for_model(CpuModel::Power5);
        assert!(p5.isel);
        assert!(!p5.cmpb);

        let p6 = Ppc64Features::for_model(CpuModel::Power6);
        assert!(p6.cmpb);
        assert!(p6.fcpsgn);
        assert!(!p6.popcntd);

        let p7 = Ppc64Features::for_model(CpuModel::Power7);
        assert!(p7.popcntd);
        assert!(!p7.byte_reverse);

        let p9 = Ppc64Features::for_model(CpuModel::Power9);
        assert_eq!(p9, Ppc64Features::all());
    }

    #[test]
    fn test_model_name_round_trip() {
        for model in [
            CpuModel::Generic,
            CpuModel::Power4,
            CpuModel::Power5,
            CpuModel::Power6,
            CpuModel::Power7,
            CpuModel::Power8,
            CpuModel::Power9,
        ] {
            assert_eq!(CpuModel::from_name(model.name()), Some(model));
        }
        assert_eq!(CpuModel::from_name("power10"), None);
    }
}
