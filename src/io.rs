/**
 * RecoLab
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;

use csv::StringRecord;

use crate::error::{DataError, Result};
use crate::EvaluationReport;

/// Reads a CSV input file. We expect NO headers, and a user, item, rating triple per line with tab
/// separation. An optional fourth column (usually a timestamp) is ignored.
pub fn csv_reader<P: AsRef<Path>>(file: P) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(file)?;

    Ok(reader)
}

pub fn ratings_from_csv<'a, R>(
    reader: &'a mut csv::Reader<R>
) -> impl Iterator<Item=Result<(String, String, f64)>> + 'a
    where R: Read {

    reader.records()
        .map(|result| {
            let record = result?;
            parse_rating(&record)
        })
}

fn parse_rating(record: &StringRecord) -> Result<(String, String, f64)> {
    let line = record.position().map(|position| position.line()).unwrap_or(0);

    if record.len() < 3 {
        return Err(DataError::Malformed {
            line,
            reason: format!("expected user, item and rating, found {} fields", record.len()),
        }.into());
    }

    let value: f64 = record[2].trim().parse()
        .map_err(|failure| DataError::Malformed {
            line,
            reason: format!("cannot parse rating '{}': {}", &record[2], failure),
        })?;

    Ok((record[0].to_string(), record[1].to_string(), value))
}

/// Output the evaluation report as JSON. If a `report_path` is supplied, we write to a file at the
/// specified path, otherwise, we output to stdout.
pub fn write_report(report: &EvaluationReport, report_path: Option<String>) -> Result<()> {

    let mut out: Box<dyn Write> = match report_path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout())
    };

    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;

    Ok(())
}
