use rand::Rng;

use crate::agents::{
    CommunityContext, ContextWorldExt, DesiredChildren, Ethnicity, ParentalBackground,
    SchoolStatus, Sex,
};
use crate::context::Context;
use crate::define_rng;
use crate::ids::PersonId;
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(InmigrantRng);

/// Persons older than this have finished school.
const SCHOOL_LEAVING_AGE_YEARS: f64 = 22.0;

/// Creates a person arriving from outside the model at `timestep`, unplaced and with
/// survey-style background drawn at random.
pub fn new_inmigrant(
    context: &mut Context,
    timestep: i64,
    age_months: i64,
    sex: Sex,
    ethnicity: Ethnicity,
) -> PersonId {
    let start_school_age = context.parameters().education.start_school_age_years;
    let draws = {
        let stats = context.statistics();
        context.sample(InmigrantRng, |rng| InmigrantDraws {
            birth_interval: stats.draw_birth_interval(rng),
            desired_children: stats.draw_desired_children(rng),
            first_birth_timing: stats.draw_first_birth_timing(rng),
            work: rng.random_bool(0.1),
            parents_contracep_ever: rng.random_bool(0.5),
            background: ParentalBackground {
                mother_work: rng.random_bool(0.5),
                father_work: rng.random_bool(0.5),
                mother_years_schooling: f64::from(rng.random_range(1_u32..15)),
                father_years_schooling: f64::from(rng.random_range(1_u32..15)),
                mother_num_children: rng.random_range(1_u32..6),
            },
            childhood_context: CommunityContext {
                school_lt_1hr: rng.random_bool(0.5),
                health_lt_1hr: rng.random_bool(0.5),
                bus_lt_1hr: rng.random_bool(0.5),
                market_lt_1hr: rng.random_bool(0.5),
                employer_lt_1hr: rng.random_bool(0.5),
            },
            schooling: f64::from(rng.random_range(1_u32..15)),
        })
    };

    let world = context.world_mut();
    let person = world.new_person(timestep - age_months, age_months, sex, ethnicity);
    let record = world.person_mut(person);
    record.in_migrant = true;
    record.first_birth_timing = draws.first_birth_timing;
    record.work = draws.work;
    record.parents_contracep_ever = draws.parents_contracep_ever;
    record.parental_background = Some(draws.background);
    record.childhood_context = draws.childhood_context;
    if record.is_female() {
        record.birth_interval = Some(draws.birth_interval);
        record.desired_children = draws.desired_children;
    }
    let age = record.age_years();
    if age > start_school_age {
        record.schooling = draws.schooling;
        record.school_status = SchoolStatus::OutOfSchool;
    }
    if age > SCHOOL_LEAVING_AGE_YEARS {
        record.school_status = SchoolStatus::OutOfSchool;
    }
    person
}

struct InmigrantDraws {
    birth_interval: i64,
    desired_children: DesiredChildren,
    first_birth_timing: i64,
    work: bool,
    parents_contracep_ever: bool,
    background: ParentalBackground,
    childhood_context: CommunityContext,
    schooling: f64,
}
