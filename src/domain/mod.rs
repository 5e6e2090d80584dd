// Domain layer - Core types and job rules

pub mod model;
pub mod rules;
