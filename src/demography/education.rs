use crate::agents::{ContextWorldExt, SchoolStatus};
use crate::context::Context;
use crate::define_rng;
use crate::demography::{tally, NeighborhoodCounts};
use crate::ids::RegionId;
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(EducationRng);

/// Advances schooling for the present persons of `region`.
///
/// Children reaching school age enroll with a drawn final level; pupils gain one
/// timestep of schooling until they reach it and then leave for good. Returns the
/// enrollments.
pub fn education(context: &mut Context, region: RegionId) -> NeighborhoodCounts {
    let start_age = context.parameters().education.start_school_age_years;
    let years_per_step = f64::from(context.parameters().model.timestep_months) / 12.0;
    let mut starts = NeighborhoodCounts::new();
    for person in context.world().region_present_persons(region) {
        let record = context.world().person(person);
        let (status, age) = (record.school_status, record.age_years());
        match status {
            SchoolStatus::Undetermined if age >= start_age => {
                let final_level = {
                    let stats = context.statistics();
                    let cutoffs = stats.education_cutoffs(context.world(), person);
                    context.sample(EducationRng, |rng| stats.draw_education_level(rng, &cutoffs))
                };
                let neighborhood = context.world().person_neighborhood(person);
                let record = context.world_mut().person_mut(person);
                record.school_status = SchoolStatus::InSchool;
                record.final_schooling = Some(final_level);
                record.schooling = years_per_step;
                tally(&mut starts, neighborhood);
            }
            SchoolStatus::InSchool => {
                let record = context.world_mut().person_mut(person);
                if record.schooling >= record.final_schooling.unwrap_or(0.0) {
                    record.school_status = SchoolStatus::OutOfSchool;
                } else {
                    record.schooling += years_per_step;
                }
            }
            SchoolStatus::Undetermined | SchoolStatus::OutOfSchool => {}
        }
    }
    starts
}
