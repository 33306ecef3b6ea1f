use std::ops::{Add, AddAssign};

use serde::Serialize;

pub const OBJECTIVE_COUNT: usize = 5;

/// The five dispatch objectives. All are minimized except
/// `DeliveredTonnage`, which is maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectiveKind {
    WaitingTime,
    EmptyDistance,
    LoadWaste,
    DeliveredTonnage,
    CarbonEmission,
}

impl ObjectiveKind {
    pub const ALL: [ObjectiveKind; OBJECTIVE_COUNT] = [
        ObjectiveKind::WaitingTime,
        ObjectiveKind::EmptyDistance,
        ObjectiveKind::LoadWaste,
        ObjectiveKind::DeliveredTonnage,
        ObjectiveKind::CarbonEmission,
    ];

    pub const fn index(self) -> usize {
        match self {
            ObjectiveKind::WaitingTime => 0,
            ObjectiveKind::EmptyDistance => 1,
            ObjectiveKind::LoadWaste => 2,
            ObjectiveKind::DeliveredTonnage => 3,
            ObjectiveKind::CarbonEmission => 4,
        }
    }

    pub const fn is_maximize(self) -> bool {
        matches!(self, ObjectiveKind::DeliveredTonnage)
    }

    /// Sign-flips maximize-type values so smaller is uniformly better.
    pub fn comparable(self, raw: f64) -> f64 {
        if self.is_maximize() { -raw } else { raw }
    }
}

/// Raw objective values for one route or one whole solution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ObjectiveVector {
    values: [f64; OBJECTIVE_COUNT],
}

impl ObjectiveVector {
    pub const fn zero() -> Self {
        Self {
            values: [0.0; OBJECTIVE_COUNT],
        }
    }

    pub fn get(&self, kind: ObjectiveKind) -> f64 {
        self.values[kind.index()]
    }

    pub fn set(&mut self, kind: ObjectiveKind, value: f64) {
        self.values[kind.index()] = value;
    }

    pub fn accumulate(&mut self, kind: ObjectiveKind, delta: f64) {
        self.values[kind.index()] += delta;
    }

    /// The raw value with maximize-type objectives negated.
    pub fn comparable(&self, kind: ObjectiveKind) -> f64 {
        kind.comparable(self.get(kind))
    }
}

impl Add for ObjectiveVector {
    type Output = ObjectiveVector;

    fn add(mut self, rhs: ObjectiveVector) -> ObjectiveVector {
        self += rhs;
        self
    }
}

impl AddAssign for ObjectiveVector {
    fn add_assign(&mut self, rhs: ObjectiveVector) {
        for i in 0..OBJECTIVE_COUNT {
            self.values[i] += rhs.values[i];
        }
    }
}

impl From<[f64; OBJECTIVE_COUNT]> for ObjectiveVector {
    fn from(values: [f64; OBJECTIVE_COUNT]) -> Self {
        Self { values }
    }
}
