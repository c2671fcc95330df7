// Two-year cost projection for a labour contract

use serde::{Deserialize, Serialize};

use crate::forms::round2;

pub const PROJECTION_MONTHS: f64 = 24.0;
pub const PROJECTION_YEARS: f64 = 2.0;
pub const GRATUITY_DAYS_PER_YEAR: f64 = 21.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LabourInputs {
    pub basic_salary: f64,
    pub housing_allowance: f64,
    pub transport_allowance: f64,
    pub other_allowance: f64,
    pub visa_cost: f64,
    pub insurance_cost: f64,
    pub air_ticket_cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabourProjection {
    pub monthly_salary: f64,
    pub annual_salary: f64,
    pub two_year_salary: f64,
    pub gratuity: f64,
    pub leave_salary: f64,
    pub air_tickets: f64,
    pub insurance: f64,
    pub two_year_total_cost: f64,
    pub average_monthly_cost: f64,
}

impl LabourInputs {
    pub fn project(&self) -> LabourProjection {
        let monthly_salary = self.basic_salary
            + self.housing_allowance
            + self.transport_allowance
            + self.other_allowance;
        let two_year_salary = monthly_salary * PROJECTION_MONTHS;
        let gratuity = self.basic_salary / 30.0 * GRATUITY_DAYS_PER_YEAR * PROJECTION_YEARS;
        let leave_salary = self.basic_salary * PROJECTION_YEARS;
        let air_tickets = self.air_ticket_cost * PROJECTION_YEARS;
        let insurance = self.insurance_cost * PROJECTION_YEARS;
        let total = two_year_salary + gratuity + leave_salary + air_tickets + insurance + self.visa_cost;

        LabourProjection {
            monthly_salary: round2(monthly_salary),
            annual_salary: round2(monthly_salary * 12.0),
            two_year_salary: round2(two_year_salary),
            gratuity: round2(gratuity),
            leave_salary: round2(leave_salary),
            air_tickets: round2(air_tickets),
            insurance: round2(insurance),
            two_year_total_cost: round2(total),
            average_monthly_cost: round2(total / PROJECTION_MONTHS),
        }
    }
}
