//! Shared test harness modules for the geolocation CLI.

use super::*;

mod import_unit;
