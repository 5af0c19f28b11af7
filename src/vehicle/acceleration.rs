/// The acceleration model of a vehicle.
#[derive(Clone, Debug)]
pub struct AccelerationModel {
    max_acc: f64,
    max_dec: f64,
    min_gap: f64,
    headway: f64,
    max_vel: f64,
    /// `2 * sqrt(max_acc * max_dec)`, cached.
    sqrt_ab: f64,
}

/// The parameters of the acceleration model.
pub struct ModelParams {
    /// The vehicle's maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The vehicle's maximum deceleration in m/s<sup>2</sup>, a positive number.
    pub max_deceleration: f64,
    /// The minimum gap to maintain to the vehicle ahead in m.
    pub min_gap: f64,
    /// The desired gap between this and the vehicle ahead in seconds.
    pub time_headway: f64,
    /// The free-flow velocity in m/s.
    pub max_velocity: f64,
}

impl AccelerationModel {
    /// Creates a new acceleration model.
    pub fn new(params: &ModelParams) -> Self {
        Self {
            max_acc: params.max_acceleration,
            max_dec: params.max_deceleration,
            min_gap: params.min_gap,
            headway: params.time_headway,
            max_vel: params.max_velocity,
            sqrt_ab: 2.0 * (params.max_acceleration * params.max_deceleration).sqrt(),
        }
    }

    /// The free-flow velocity.
    pub fn max_vel(&self) -> f64 {
        self.max_vel
    }

    /// The minimum gap to the vehicle ahead.
    pub fn min_gap(&self) -> f64 {
        self.min_gap
    }

    /// Calculates the acceleration on an empty road.
    pub fn free_road(&self, vel: f64) -> f64 {
        self.idm(vel, 0.0)
    }

    /// Calculates the acceleration needed to follow the vehicle or barrier ahead.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `gap` - The net distance to the lead (m).
    /// * `lead_vel` - The lead's velocity (m/s).
    pub fn follow(&self, vel: f64, gap: f64, lead_vel: f64) -> f64 {
        if gap <= 0.0 {
            // Already touching the lead
            return -self.max_dec;
        }
        let appr = vel - lead_vel;
        let desired = self.min_gap + f64::max(0.0, self.headway * vel + appr * vel / self.sqrt_ab);
        self.idm(vel, desired / gap)
    }

    /// Calculates the hard braking applied to a stopped vehicle.
    pub fn emergency_stop(&self, vel: f64) -> f64 {
        -self.max_dec * vel / self.max_vel
    }

    /// Computes an acceleration using the intelligent driver model.
    fn idm(&self, vel: f64, interaction: f64) -> f64 {
        self.max_acc * (1.0 - (vel / self.max_vel).powi(4) - interaction * interaction)
    }
}
