// ============================================================
// Layer 5 - Reduce-on-Plateau Scheduler
// ============================================================
// Multiplies the learning rate by `factor` once the monitored
// dev value has stopped improving for more than `patience`
// validations.
//
//   improved  ⇔  value < best * (1 - threshold)     (mode "min")
//
// NaN compares false, so it never counts as an improvement.

/// Outcome of one `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlateauStep {
    Improved,
    Waiting { bad_steps: usize },
    Decayed { from: f64, to: f64 },
}

#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    lr:        f64,
    factor:    f64,
    patience:  usize,
    threshold: f64,
    floor_lr:  f64,
    eps:       f64,
    best:      f64,
    bad_steps: usize,
}

impl ReduceLrOnPlateau {
    pub const PATIENCE: usize = 2;
    pub const THRESHOLD: f64 = 1e-4;
    pub const EPS: f64 = 1e-8;

    pub fn new(init_lr: f64, factor: f64) -> Self {
        Self {
            lr:        init_lr,
            factor,
            patience:  Self::PATIENCE,
            threshold: Self::THRESHOLD,
            floor_lr:  0.0,
            eps:       Self::EPS,
            best:      f64::INFINITY,
            bad_steps: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn step(&mut self, value: f64) -> PlateauStep {
        if value < self.best * (1.0 - self.threshold) {
            self.best = value;
            self.bad_steps = 0;
            return PlateauStep::Improved;
        }

        self.bad_steps += 1;
        if self.bad_steps <= self.patience {
            return PlateauStep::Waiting { bad_steps: self.bad_steps };
        }

        self.bad_steps = 0;
        let from = self.lr;
        let to = (from * self.factor).max(self.floor_lr);
        if from - to > self.eps {
            self.lr = to;
            PlateauStep::Decayed { from, to }
        } else {
            PlateauStep::Waiting { bad_steps: 0 }
        }
    }
}
