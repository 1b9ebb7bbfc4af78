pub mod group_policy;
pub mod registrations;
pub mod warnings;
