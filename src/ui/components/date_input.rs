use chrono::{Datelike, Months, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Digit-by-digit date editor. The year takes four digits, month and day two;
/// each completed part is applied immediately and invalid parts are ignored.
#[derive(Debug, Clone)]
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    /// Only year and month are edited; the day stays on the 1st
    pub month_only: bool,
    current_date_input: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            month_only: false,
            current_date_input: String::new(),
        }
    }

    pub fn month(date: NaiveDate) -> Self {
        Self {
            date: date.with_day(1).unwrap_or(date),
            month_only: true,
            ..Self::new(date)
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.date_part = DatePart::Year;
            self.current_date_input.clear();
        }
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match (self.date_part, self.month_only) {
            (DatePart::Year, _) => DatePart::Month,
            (DatePart::Month, true) => DatePart::Year,
            (DatePart::Month, false) => DatePart::Day,
            (DatePart::Day, _) => DatePart::Year,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match (self.date_part, self.month_only) {
            (DatePart::Year, true) => DatePart::Month,
            (DatePart::Year, false) => DatePart::Day,
            (DatePart::Month, _) => DatePart::Year,
            (DatePart::Day, _) => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    /// Step the focused part up or down by one.
    fn step(&mut self, forward: bool) {
        let stepped = match self.date_part {
            DatePart::Year => {
                let months = Months::new(12);
                if forward {
                    self.date.checked_add_months(months)
                } else {
                    self.date.checked_sub_months(months)
                }
            }
            DatePart::Month => {
                let months = Months::new(1);
                if forward {
                    self.date.checked_add_months(months)
                } else {
                    self.date.checked_sub_months(months)
                }
            }
            DatePart::Day => {
                if forward {
                    self.date.succ_opt()
                } else {
                    self.date.pred_opt()
                }
            }
        };
        if let Some(date) = stepped {
            self.date = date;
        }
    }

    fn apply_part(&mut self, value: u32) {
        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
        let updated = match self.date_part {
            DatePart::Year if (1900..=2100).contains(&value) => {
                let year = value as i32;
                NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
            }
            DatePart::Month if (1..=12).contains(&value) => {
                NaiveDate::from_ymd_opt(year, value, day.min(days_in_month(year, value)))
            }
            DatePart::Day if value >= 1 && value <= days_in_month(year, month) => {
                NaiveDate::from_ymd_opt(year, month, value)
            }
            _ => None,
        };
        if let Some(date) = updated {
            self.date = date;
        }
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.current_date_input.push(c);
                let width = match self.date_part {
                    DatePart::Year => 4,
                    DatePart::Month | DatePart::Day => 2,
                };
                if self.current_date_input.len() == width {
                    if let Ok(value) = self.current_date_input.parse::<u32>() {
                        self.apply_part(value);
                    }
                    self.current_date_input.clear();
                    if self.date_part != DatePart::Day && !(self.month_only && self.date_part == DatePart::Month) {
                        self.next_date_part();
                    }
                }
            }
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Up => self.step(true),
            KeyCode::Down => self.step(false),
            KeyCode::Right | KeyCode::Char('-') => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    pub fn get_display_string(&self) -> String {
        let year = format!("{:04}", self.date.year());
        let month = format!("{:02}", self.date.month());
        let day = format!("{:02}", self.date.day());

        if !self.editing {
            return if self.month_only {
                format!("{year}-{month}")
            } else {
                format!("{year}-{month}-{day}")
            };
        }

        let current_input = if !self.current_date_input.is_empty() {
            format!("[{}]", self.current_date_input)
        } else {
            match self.date_part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        };

        match (self.date_part, self.month_only) {
            (DatePart::Year, true) => format!("{year}{current_input}-{month}"),
            (DatePart::Month, true) => format!("{year}-{month}{current_input}"),
            (DatePart::Year, false) => format!("{year}{current_input}-{month}-{day}"),
            (DatePart::Month, false) => format!("{year}-{month}{current_input}-{day}"),
            (DatePart::Day, _) => format!("{year}-{month}-{day}{current_input}"),
        }
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = first.and_then(|d| d.checked_add_months(Months::new(1)));
    match (first, next) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_a_full_date_walks_the_parts() {
        let mut state = DateInputState::new(date(2024, 1, 15));
        state.toggle_editing();
        type_digits(&mut state, "20230704");
        assert_eq!(state.date, date(2023, 7, 4));
        assert_eq!(state.date_part, DatePart::Day);
    }

    #[test]
    fn month_change_clamps_the_day() {
        let mut state = DateInputState::new(date(2024, 1, 31));
        state.toggle_editing();
        state.next_date_part();
        type_digits(&mut state, "02");
        assert_eq!(state.date, date(2024, 2, 29));
    }

    #[test]
    fn invalid_parts_are_ignored() {
        let mut state = DateInputState::new(date(2024, 4, 10));
        state.toggle_editing();
        state.date_part = DatePart::Day;
        type_digits(&mut state, "31");
        assert_eq!(state.date, date(2024, 4, 10));

        state.handle_input(KeyCode::Up);
        assert_eq!(state.date, date(2024, 4, 11));
    }

    #[test]
    fn not_editing_ignores_keys() {
        let mut state = DateInputState::new(date(2024, 4, 10));
        type_digits(&mut state, "1999");
        assert_eq!(state.date, date(2024, 4, 10));
    }

    #[test]
    fn month_only_skips_the_day() {
        let mut state = DateInputState::month(date(2024, 5, 20));
        assert_eq!(state.date, date(2024, 5, 1));
        assert_eq!(state.get_display_string(), "2024-05");

        state.toggle_editing();
        type_digits(&mut state, "2023");
        assert_eq!(state.date_part, DatePart::Month);
        type_digits(&mut state, "11");
        assert_eq!(state.date_part, DatePart::Month);
        assert_eq!(state.date, date(2023, 11, 1));
        state.next_date_part();
        assert_eq!(state.date_part, DatePart::Year);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }
}
