//! Static game data: the sub-profession table baked in at build time and
//! the runtime skill display-name table.

mod skill_names;

pub use skill_names::SkillNames;

include!(concat!(env!("OUT_DIR"), "/sub_professions.rs"));

/// Sub-profession implied by casting `skill_id`, if the skill is a
/// signature ability of one.
#[inline]
pub fn sub_profession_for(skill_id: u64) -> Option<&'static str> {
    SUB_PROFESSIONS.get(&skill_id).copied()
}
