// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShapingError {
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("CSV parse error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("chart '{kind}' requires the '{role}' role but no column is mapped to it")]
    MissingRole { kind: String, role: String },
    #[error("column '{column}' mapped to '{role}' does not exist in the dataset")]
    MissingColumn { column: String, role: String },
    #[error("column '{column}' mapped to '{role}' must be {expected}, found {found}")]
    TypeMismatch {
        column: String,
        role: String,
        expected: String,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, ShapingError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ChartResult<T> = std::result::Result<T, ChartError>;

impl ShapingError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ShapingError::Chart(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            ShapingError::Data(_) => "Data",
            ShapingError::Chart(_) => "Chart",
            ShapingError::Io(_) => "I/O",
        }
    }
}

impl DataError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DataError::InvalidInput {
            reason: reason.into(),
        }
    }
}
