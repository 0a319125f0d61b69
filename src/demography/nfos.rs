use crate::agents::{ContextWorldExt, Neighborhood};
use crate::context::Context;
use crate::define_rng;
use crate::demography::{tally, NeighborhoodCounts};
use crate::ids::RegionId;
use crate::log::debug;
use crate::parameters::{ContextParametersExt, NeighborhoodWeighting};
use crate::random::ContextRandomExt;

define_rng!(NfoRng);

/// Distances below this count as this close when weighting by inverse distance.
const MIN_DISTANCE_KM: f64 = 0.001;

fn weight(neighborhood: &Neighborhood, weighting: NeighborhoodWeighting) -> f64 {
    let distance = match weighting {
        NeighborhoodWeighting::Random => return 1.0,
        NeighborhoodWeighting::InvDistForestClosestKm => neighborhood.forest.closest_km,
        NeighborhoodWeighting::InvDistCnpKm => neighborhood.forest.national_park_km,
        NeighborhoodWeighting::InvDistBzKm => neighborhood.forest.buffer_zone_km,
        NeighborhoodWeighting::InvDistNarayangarKm => neighborhood.dist_nara_km,
    };
    1.0 / distance.max(MIN_DISTANCE_KM)
}

/// Opens the non-family organizations drawn for this timestep. Each one halves the
/// walking time to its service in the neighborhood chosen for it. Does nothing unless
/// enabled.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn establish_nfos(context: &mut Context, region: RegionId) -> NeighborhoodCounts {
    let mut counts = NeighborhoodCounts::new();
    let parameters = context.parameters().nfos.clone();
    if !parameters.enabled {
        return counts;
    }
    let neighborhoods = context.world().region_neighborhoods(region);
    if neighborhoods.is_empty() {
        return counts;
    }
    let weights: Vec<f64> = neighborhoods
        .iter()
        .map(|&nid| weight(context.world().neighborhood(nid), parameters.weighting))
        .collect();

    for nfo in &parameters.types {
        let opening = context.sample_distr(NfoRng, &nfo.count).max(0.0) as usize;
        for _ in 0..opening {
            let nid = neighborhoods[context.sample_weighted(NfoRng, &weights)];
            let minutes = context
                .world_mut()
                .neighborhood_mut(nid)
                .services
                .get_mut(nfo.service);
            *minutes /= 2.0;
            debug!("{} NFO opened in neighborhood {nid}", nfo.service);
            tally(&mut counts, Some(nid));
        }
    }
    counts
}
