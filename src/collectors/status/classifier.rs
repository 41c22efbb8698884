/// Metric family a status name is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFamily {
    Commands,
    ConnectionErrors,
    InnodbRows,
    PerformanceSchema,
    /// Registered verbatim under its own name.
    Generic,
}

/// Labeled families and the status-name prefix that selects each one.
/// Prefixes are disjoint, first match wins.
const PREFIXES: [(&str, StatusFamily); 4] = [
    ("com_", StatusFamily::Commands),
    ("connection_errors_", StatusFamily::ConnectionErrors),
    ("innodb_rows_", StatusFamily::InnodbRows),
    ("performance_schema_", StatusFamily::PerformanceSchema),
];

impl StatusFamily {
    pub const LABELED: [Self; 4] = [
        Self::Commands,
        Self::ConnectionErrors,
        Self::InnodbRows,
        Self::PerformanceSchema,
    ];

    /// Metric name (without namespace) of a labeled family.
    #[must_use]
    pub const fn metric_name(self) -> Option<&'static str> {
        match self {
            Self::Commands => Some("commands_total"),
            Self::ConnectionErrors => Some("connection_errors_total"),
            Self::InnodbRows => Some("innodb_rows_total"),
            Self::PerformanceSchema => Some("performance_schema_total"),
            Self::Generic => None,
        }
    }

    #[must_use]
    pub const fn label_name(self) -> Option<&'static str> {
        match self {
            Self::Commands => Some("command"),
            Self::ConnectionErrors => Some("error"),
            Self::InnodbRows => Some("operation"),
            Self::PerformanceSchema => Some("instrumentation"),
            Self::Generic => None,
        }
    }

    #[must_use]
    pub const fn help(self) -> &'static str {
        match self {
            Self::Commands => "Number of executed mysql commands.",
            Self::ConnectionErrors => "Number of mysql connection errors.",
            Self::InnodbRows => "Mysql Innodb row operations.",
            Self::PerformanceSchema => {
                "Mysql instrumentations that could not be loaded or created due to memory constraints"
            }
            Self::Generic => "Generic metric from SHOW GLOBAL STATUS / SHOW SLAVE STATUS.",
        }
    }
}

/// Route a lower-cased status name to its family and label value.
///
/// For labeled families the label is the name with the prefix stripped (possibly empty,
/// e.g. `"com_"`); for the generic family it is the full name.
#[must_use]
pub fn classify(name: &str) -> (StatusFamily, &str) {
    PREFIXES
        .iter()
        .find_map(|(prefix, family)| name.strip_prefix(*prefix).map(|label| (*family, label)))
        .unwrap_or((StatusFamily::Generic, name))
}
