use crate::agents::ContextWorldExt;
use crate::context::Context;
use crate::define_rng;
use crate::error::AbmError;
use crate::ids::{HouseholdId, NeighborhoodId, RegionId};
use crate::log::{debug, trace};
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(PlacementRng);

/// A uniformly chosen neighborhood of `region`.
///
/// # Panics
///
/// Panics if the region has no neighborhoods.
pub fn random_neighborhood(context: &Context, region: RegionId) -> NeighborhoodId {
    let neighborhoods = context.world().region_neighborhoods(region);
    assert!(!neighborhoods.is_empty(), "Region {region} has no neighborhoods");
    neighborhoods[context.sample_range(PlacementRng, 0..neighborhoods.len())]
}

/// Creates an empty, unplaced household with drawn ownership and fuel flags.
pub fn found_household(context: &mut Context) -> HouseholdId {
    let flags = {
        let stats = context.statistics();
        context.sample(PlacementRng, |rng| stats.draw_household_flags(rng))
    };
    context.world_mut().new_household(flags)
}

/// Places an unplaced household in `preferred`, or when that has no room in the
/// nearest neighborhood that does. Each attempt draws a fresh plot area.
///
/// # Errors
///
/// `AbmError::NoLandAvailable` when no neighborhood has room.
pub fn place_household(
    context: &mut Context,
    household: HouseholdId,
    preferred: NeighborhoodId,
) -> Result<NeighborhoodId, AbmError> {
    let mut candidates = vec![preferred];
    candidates.extend_from_slice(&context.world().neighborhood(preferred).neighborhoods_by_distance);
    for nid in candidates {
        let area = {
            let stats = context.statistics();
            context.sample(PlacementRng, |rng| stats.draw_household_area(rng))
        };
        if context
            .world_mut()
            .add_household_to_neighborhood(household, nid, Some(area))
        {
            trace!("household {household} placed in neighborhood {nid} on {area:.0} m2");
            return Ok(nid);
        }
        debug!("no room for household {household} in neighborhood {nid}");
    }
    Err(AbmError::NoLandAvailable(household.0))
}
