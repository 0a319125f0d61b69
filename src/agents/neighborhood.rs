use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::agents::agent_set::AgentSet;
use crate::agents::person::CommunityContext;
use crate::ids::{HouseholdId, NeighborhoodId, RegionId};

/// Land use areas in square meters. Their sum stays constant for a neighborhood.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct LandUse {
    pub agveg: f64,
    pub nonagveg: f64,
    pub privbldg: f64,
    pub pubbldg: f64,
    pub other: f64,
}

impl LandUse {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.agveg + self.nonagveg + self.privbldg + self.pubbldg + self.other
    }
}

/// Walking minutes to the nearest non-family organization of each type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ServiceTimes {
    pub school: f64,
    pub health: f64,
    pub bus: f64,
    pub market: f64,
    pub employer: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceKind {
    School,
    Health,
    Bus,
    Market,
    Employer,
}

impl ServiceTimes {
    #[must_use]
    pub fn get(&self, kind: ServiceKind) -> f64 {
        match kind {
            ServiceKind::School => self.school,
            ServiceKind::Health => self.health,
            ServiceKind::Bus => self.bus,
            ServiceKind::Market => self.market,
            ServiceKind::Employer => self.employer,
        }
    }

    pub fn get_mut(&mut self, kind: ServiceKind) -> &mut f64 {
        match kind {
            ServiceKind::School => &mut self.school,
            ServiceKind::Health => &mut self.health,
            ServiceKind::Bus => &mut self.bus,
            ServiceKind::Market => &mut self.market,
            ServiceKind::Employer => &mut self.employer,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ForestType {
    /// Buffer zone community forest.
    #[serde(rename = "BZ")]
    #[strum(serialize = "BZ")]
    BufferZone,
    /// Chitwan National Park.
    #[serde(rename = "CNP")]
    #[strum(serialize = "CNP")]
    NationalPark,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ForestDistances {
    pub buffer_zone_km: f64,
    pub national_park_km: f64,
    pub closest_km: f64,
    pub closest_type: ForestType,
}

#[derive(Clone, Debug)]
pub struct Neighborhood {
    pub id: NeighborhoodId,
    pub region: RegionId,
    pub households: AgentSet<HouseholdId>,
    pub land: LandUse,
    /// Fixed at creation; `land.total()` must always match it.
    pub total_area: f64,
    pub x: f64,
    pub y: f64,
    pub elec_available: bool,
    pub dist_nara_km: f64,
    pub services: ServiceTimes,
    pub forest: ForestDistances,
    pub avg_yrs_services_lt15: f64,
    pub avg_yrs_services_lt30: f64,
    /// Every other neighborhood, nearest first.
    pub neighborhoods_by_distance: Vec<NeighborhoodId>,
}

impl Neighborhood {
    /// A neighborhood with the given land and position and no services, forest or
    /// households.
    #[must_use]
    pub fn new(id: NeighborhoodId, region: RegionId, land: LandUse, x: f64, y: f64) -> Neighborhood {
        Neighborhood {
            id,
            region,
            households: AgentSet::new(),
            land,
            total_area: land.total(),
            x,
            y,
            elec_available: false,
            dist_nara_km: 0.0,
            services: ServiceTimes::default(),
            forest: ForestDistances {
                buffer_zone_km: 0.0,
                national_park_km: 0.0,
                closest_km: 0.0,
                closest_type: ForestType::BufferZone,
            },
            avg_yrs_services_lt15: 0.0,
            avg_yrs_services_lt30: 0.0,
            neighborhoods_by_distance: Vec::new(),
        }
    }

    /// Which services are within an hour's walk.
    #[must_use]
    pub fn community_context(&self) -> CommunityContext {
        CommunityContext {
            school_lt_1hr: self.services.school < 60.0,
            health_lt_1hr: self.services.health < 60.0,
            bus_lt_1hr: self.services.bus < 60.0,
            market_lt_1hr: self.services.market < 60.0,
            employer_lt_1hr: self.services.employer < 60.0,
        }
    }

    #[must_use]
    pub fn distance_to(&self, other: &Neighborhood) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Converts `area` of vegetation into a private building plot, taking agricultural
    /// land first. Returns false and changes nothing if neither kind has room.
    pub fn claim_plot(&mut self, area: f64) -> bool {
        if self.land.agveg - area >= 0.0 {
            self.land.agveg -= area;
        } else if self.land.nonagveg - area >= 0.0 {
            self.land.nonagveg -= area;
        } else {
            return false;
        }
        self.land.privbldg += area;
        true
    }

    /// Gives a plot back to agriculture.
    pub fn release_plot(&mut self, area: f64) {
        self.land.privbldg -= area;
        self.land.agveg += area;
    }

    #[must_use]
    pub fn percent_agveg(&self) -> f64 {
        if self.total_area > 0.0 {
            self.land.agveg / self.total_area * 100.0
        } else {
            0.0
        }
    }

    /// Whether `area` of land moved between categories without changing the total.
    #[must_use]
    pub fn land_is_conserved(&self) -> bool {
        (self.land.total() - self.total_area).abs() <= 1e-6 * self.total_area.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn farmland() -> Neighborhood {
        let land = LandUse {
            agveg: 100.0,
            nonagveg: 50.0,
            privbldg: 10.0,
            pubbldg: 5.0,
            other: 5.0,
        };
        Neighborhood::new(NeighborhoodId(1), RegionId(0), land, 0.0, 0.0)
    }

    #[test]
    fn plots_come_from_agveg_then_nonagveg() {
        let mut nbh = farmland();
        assert!(nbh.claim_plot(80.0));
        assert_approx_eq!(nbh.land.agveg, 20.0);
        assert!(nbh.claim_plot(40.0));
        assert_approx_eq!(nbh.land.agveg, 20.0);
        assert_approx_eq!(nbh.land.nonagveg, 10.0);
        assert_approx_eq!(nbh.land.privbldg, 130.0);
        assert!(nbh.land_is_conserved());
    }

    #[test]
    fn claim_fails_without_room() {
        let mut nbh = farmland();
        let before = nbh.land;
        assert!(!nbh.claim_plot(120.0));
        assert_eq!(nbh.land, before);
    }

    #[test]
    fn released_plot_returns_to_agriculture() {
        let mut nbh = farmland();
        assert!(nbh.claim_plot(30.0));
        nbh.release_plot(30.0);
        assert_approx_eq!(nbh.land.agveg, 100.0);
        assert_approx_eq!(nbh.land.privbldg, 10.0);
        assert_approx_eq!(nbh.percent_agveg(), 100.0 / 170.0 * 100.0);
    }

    #[test]
    fn community_context_uses_one_hour() {
        let mut nbh = farmland();
        nbh.services.school = 30.0;
        nbh.services.health = 60.0;
        nbh.services.market = 75.0;
        let context = nbh.community_context();
        assert!(context.school_lt_1hr);
        assert!(!context.health_lt_1hr);
        assert!(!context.market_lt_1hr);
    }
}
