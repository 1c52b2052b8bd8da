//! Flight dataset catalog.
//!
//! The fixed set of tables that may be previewed by name, and the example
//! queries offered by the dashboard. Table names from users or HTTP paths are
//! parsed into [`FlightTable`] and never spliced into SQL text.

use std::fmt;
use std::str::FromStr;

use crate::error::FlightError;

/// Maximum rows returned by a table preview.
pub const PREVIEW_ROW_LIMIT: usize = 1000;

/// A table of the flight-operations schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightTable {
    Countries,
    Cities,
    Airlines,
    Airports,
    Crew,
    FlightCrew,
    Tickets,
    FuelConsumption,
    Incidents,
    Baggage,
    Passengers,
    Aircraft,
    Flights,
    Routes,
    Weather,
}

impl FlightTable {
    /// Every table, in the order the dashboard lists them.
    pub const ALL: [FlightTable; 15] = [
        Self::Countries,
        Self::Cities,
        Self::Airlines,
        Self::Airports,
        Self::Crew,
        Self::FlightCrew,
        Self::Tickets,
        Self::FuelConsumption,
        Self::Incidents,
        Self::Baggage,
        Self::Passengers,
        Self::Aircraft,
        Self::Flights,
        Self::Routes,
        Self::Weather,
    ];

    /// Returns the table name as it appears in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Countries => "countries",
            Self::Cities => "cities",
            Self::Airlines => "airlines",
            Self::Airports => "airports",
            Self::Crew => "crew",
            Self::FlightCrew => "flightcrew",
            Self::Tickets => "tickets",
            Self::FuelConsumption => "fuelconsumption",
            Self::Incidents => "incidents",
            Self::Baggage => "baggage",
            Self::Passengers => "passengers",
            Self::Aircraft => "aircraft",
            Self::Flights => "flights",
            Self::Routes => "routes",
            Self::Weather => "weather",
        }
    }

    /// Returns the statement that previews this table.
    pub fn preview_sql(&self) -> &'static str {
        match self {
            Self::Countries => "SELECT * FROM countries LIMIT 1000",
            Self::Cities => "SELECT * FROM cities LIMIT 1000",
            Self::Airlines => "SELECT * FROM airlines LIMIT 1000",
            Self::Airports => "SELECT * FROM airports LIMIT 1000",
            Self::Crew => "SELECT * FROM crew LIMIT 1000",
            Self::FlightCrew => "SELECT * FROM flightcrew LIMIT 1000",
            Self::Tickets => "SELECT * FROM tickets LIMIT 1000",
            Self::FuelConsumption => "SELECT * FROM fuelconsumption LIMIT 1000",
            Self::Incidents => "SELECT * FROM incidents LIMIT 1000",
            Self::Baggage => "SELECT * FROM baggage LIMIT 1000",
            Self::Passengers => "SELECT * FROM passengers LIMIT 1000",
            Self::Aircraft => "SELECT * FROM aircraft LIMIT 1000",
            Self::Flights => "SELECT * FROM flights LIMIT 1000",
            Self::Routes => "SELECT * FROM routes LIMIT 1000",
            Self::Weather => "SELECT * FROM weather LIMIT 1000",
        }
    }

    /// Default file name for a CSV export of this table.
    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for FlightTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightTable {
    type Err = FlightError;

    /// Matches exact table names, ignoring ASCII case and surrounding space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|table| table.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| FlightError::invalid_input(format!("unknown table: {name}")))
    }
}

/// A named query the dashboard can load into the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExampleQuery {
    pub title: &'static str,
    pub sql: &'static str,
}

/// Example queries offered by `\examples`.
pub const EXAMPLE_QUERIES: &[ExampleQuery] = &[
    ExampleQuery {
        title: "Avg weight of passengers who have at least 2 bags",
        sql: "SELECT
    p.passenger_id,
    p.first_name,
    p.last_name,
    COUNT(b.baggage_id) AS num_bags,
    AVG(b.weight) AS avg_weight
FROM passengers p
JOIN baggage b ON p.passenger_id = b.passenger_id
GROUP BY p.passenger_id, p.first_name, p.last_name
HAVING COUNT(b.baggage_id) >= 2
ORDER BY avg_weight DESC",
    },
    ExampleQuery {
        title: "List of flights with delayed status and weather details at departure",
        sql: "SELECT
    f.flight_number,
    a.airline_name,
    ap.airport_name AS departure_airport,
    w.temperature,
    w.wind_speed,
    w.precipitation,
    f.departure_time
FROM flights f
JOIN airlines a ON f.airline_id = a.airline_id
JOIN airports ap ON f.departure_airport_id = ap.airport_id
JOIN weather w ON f.weather_id = w.weather_id
WHERE f.flight_status = 'Delayed'
ORDER BY f.flight_number",
    },
];

/// Looks up an example by its 1-based position.
pub fn example(number: usize) -> Option<&'static ExampleQuery> {
    number.checked_sub(1).and_then(|i| EXAMPLE_QUERIES.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::{classify_sql, StatementKind};

    #[test]
    fn test_parse_known_tables() {
        assert_eq!("flights".parse::<FlightTable>().unwrap(), FlightTable::Flights);
        assert_eq!(" Weather ".parse::<FlightTable>().unwrap(), FlightTable::Weather);
        assert_eq!(
            "FLIGHTCREW".parse::<FlightTable>().unwrap(),
            FlightTable::FlightCrew
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_injection() {
        assert!("pilots".parse::<FlightTable>().is_err());
        assert!("flights; DROP TABLE flights".parse::<FlightTable>().is_err());
        assert!("".parse::<FlightTable>().is_err());
    }

    #[test]
    fn test_every_table_round_trips_and_previews() {
        for table in FlightTable::ALL {
            assert_eq!(table.as_str().parse::<FlightTable>().unwrap(), table);
            assert_eq!(
                table.preview_sql(),
                format!("SELECT * FROM {} LIMIT {}", table.as_str(), PREVIEW_ROW_LIMIT)
            );
        }
    }

    #[test]
    fn test_csv_file_name() {
        assert_eq!(FlightTable::Baggage.csv_file_name(), "baggage.csv");
    }

    #[test]
    fn test_examples_are_reads() {
        for example in EXAMPLE_QUERIES {
            let classification = classify_sql(example.sql);
            assert!(classification.parsed, "{}", example.title);
            assert_eq!(classification.kind, StatementKind::Read);
        }
    }

    #[test]
    fn test_example_lookup_is_one_based() {
        assert!(example(0).is_none());
        assert_eq!(example(1).unwrap().title, EXAMPLE_QUERIES[0].title);
        assert!(example(EXAMPLE_QUERIES.len() + 1).is_none());
    }
}
