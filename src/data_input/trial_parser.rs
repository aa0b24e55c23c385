// src/data_input/trial_parser.rs

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use ndarray::Array1;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::constants::{ANALOG_FILE, DEFAULT_FRAME_RATE_HZ, EVENTS_FILE, FRAME_COLUMN, KINEMATICS_FILE};
use crate::data_input::trial_data::{
    AnalogData, AnalogSignal, EventKind, GaitEvent, GaitEvents, Side, Signal, TrialData,
};
use crate::error::{GaitDataError, Result};

/// Parsed kinematics file: signals plus the metadata that came with them.
#[derive(Debug, Clone)]
pub struct KinematicsFile {
    pub trial_name: Option<String>,
    pub frame_rate: f64,
    pub roi_offset: i64,
    pub signals: Vec<Signal>,
}

/// Splits a file into leading `key,value` metadata and the CSV table that
/// starts at the first line accepted by `is_header`.
fn split_metadata<R: Read>(
    reader: R,
    is_header: impl Fn(&str) -> bool,
) -> Result<(Vec<(String, String)>, String)> {
    let mut metadata: Vec<(String, String)> = Vec::new();
    let mut csv_lines: Vec<String> = Vec::new();
    let mut found_csv_headers = false;

    for line_result in BufReader::new(reader).lines() {
        let line = line_result?;
        let trimmed_line = line.trim();
        if trimmed_line.is_empty() {
            continue;
        }

        if !found_csv_headers && is_header(trimmed_line) {
            found_csv_headers = true;
            csv_lines.push(line);
            continue;
        }

        if found_csv_headers {
            csv_lines.push(line);
        } else {
            let mut rdr = ReaderBuilder::new()
                .has_headers(false)
                .from_reader(trimmed_line.as_bytes());
            if let Some(Ok(record)) = rdr.records().next() {
                if record.len() >= 2 {
                    let key = record.get(0).unwrap_or("").trim().trim_matches('"').to_string();
                    let value = record.get(1).unwrap_or("").trim().trim_matches('"').to_string();
                    if !key.is_empty() {
                        metadata.push((key.to_ascii_lowercase(), value));
                    }
                }
            }
        }
    }

    if !found_csv_headers {
        return Err(GaitDataError::Parse("could not find CSV headers".to_string()));
    }
    debug!("Extracted {} metadata entries", metadata.len());
    Ok((metadata, csv_lines.join("\n")))
}

fn metadata_value<'a>(metadata: &'a [(String, String)], key: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn metadata_f64(metadata: &[(String, String)], key: &str) -> Result<Option<f64>> {
    match metadata_value(metadata, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| GaitDataError::Parse(format!("metadata '{}' is not a number: '{}'", key, raw))),
    }
}

/// Frames may be exported as integers or as floats such as `90.0`.
fn parse_frame(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

fn first_column_is_frame(line: &str) -> bool {
    line.split(',')
        .next()
        .map(|h| h.trim().trim_matches('"').eq_ignore_ascii_case(FRAME_COLUMN))
        .unwrap_or(false)
}

/// Parses a kinematics table: optional metadata (`trial`, `frame_rate`,
/// `roi_offset`) followed by a `frame,<signal>,...` header.
///
/// Unparseable cells become NaN (marker gaps); rows without a valid frame are skipped.
/// Without `roi_offset` metadata the first frame number is taken as the offset.
pub fn parse_kinematics<R: Read>(reader: R) -> Result<KinematicsFile> {
    let (metadata, csv_content) = split_metadata(reader, first_column_is_frame)?;

    let frame_rate = metadata_f64(&metadata, "frame_rate")?.unwrap_or(DEFAULT_FRAME_RATE_HZ);
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(GaitDataError::InvalidParameter(format!("frame rate {}", frame_rate)));
    }
    let declared_offset = match metadata_value(&metadata, "roi_offset") {
        Some(raw) => Some(
            parse_frame(raw)
                .ok_or_else(|| GaitDataError::Parse(format!("roi_offset is not a frame: '{}'", raw)))?,
        ),
        None => None,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_content.as_bytes());
    let header_record = reader.headers()?.clone();
    let signal_names: Vec<String> = header_record.iter().skip(1).map(|h| h.to_string()).collect();
    debug!("Kinematic channels found: {:?}", signal_names);

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); signal_names.len()];
    let mut first_frame: Option<i64> = None;
    let mut gap_count = 0usize;

    for (row_index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping kinematics row {} due to CSV read error: {}", row_index + 1, e);
                continue;
            }
        };
        let frame = match record.get(0).and_then(parse_frame) {
            Some(frame) => frame,
            None => {
                warn!("Skipping kinematics row {} due to missing or invalid frame", row_index + 1);
                continue;
            }
        };
        first_frame.get_or_insert(frame);

        for (col, values) in columns.iter_mut().enumerate() {
            let value = record
                .get(col + 1)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or_else(|| {
                    gap_count += 1;
                    f64::NAN
                });
            values.push(value);
        }
    }

    if gap_count > 0 {
        warn!("{} kinematic samples were missing and stored as NaN", gap_count);
    }

    let roi_offset = declared_offset.or(first_frame).unwrap_or(0);
    let signals = signal_names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Signal::new(name, Array1::from(values), frame_rate, roi_offset))
        .collect();

    Ok(KinematicsFile {
        trial_name: metadata_value(&metadata, "trial").map(str::to_string),
        frame_rate,
        roi_offset,
        signals,
    })
}

fn column_index(header: &StringRecord, name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| GaitDataError::Parse(format!("missing '{}' column in events table", name)))
}

/// Parses a `side,kind,frame` event table. Rows that cannot be parsed are skipped with a warning.
pub fn parse_events<R: Read>(reader: R) -> Result<GaitEvents> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let header_record = reader.headers()?.clone();
    let side_idx = column_index(&header_record, "side")?;
    let kind_idx = column_index(&header_record, "kind")?;
    let frame_idx = column_index(&header_record, "frame")?;

    let mut events = GaitEvents::default();
    for (row_index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping event row {} due to CSV read error: {}", row_index + 1, e);
                continue;
            }
        };
        let side = record.get(side_idx).unwrap_or("").parse::<Side>();
        let kind = record.get(kind_idx).unwrap_or("").parse::<EventKind>();
        let frame = record.get(frame_idx).and_then(parse_frame);
        match (side, kind, frame) {
            (Ok(side), Ok(kind), Some(frame)) => events.push(GaitEvent { side, kind, frame }),
            _ => warn!("Skipping event row {}: {:?}", row_index + 1, record),
        }
    }
    Ok(events)
}

/// Parses an analog table: `sample_rate` metadata followed by a header of channel names.
///
/// Analog rows are not skipped on error since that would shift every later sample in time.
pub fn parse_analog<R: Read>(reader: R, frame_rate: f64) -> Result<AnalogData> {
    let (metadata, csv_content) = split_metadata(reader, |line| {
        !line.to_ascii_lowercase().starts_with("sample_rate")
    })?;
    let sample_rate = metadata_f64(&metadata, "sample_rate")?
        .ok_or_else(|| GaitDataError::Parse("analog table has no 'sample_rate' metadata".to_string()))?;
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(GaitDataError::InvalidParameter(format!("analog sample rate {}", sample_rate)));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_content.as_bytes());
    let names: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for (row_index, result) in reader.records().enumerate() {
        let record = result?;
        for (col, values) in columns.iter_mut().enumerate() {
            let raw = record.get(col).unwrap_or("");
            let value = raw.parse::<f64>().map_err(|_| {
                GaitDataError::Parse(format!(
                    "analog row {} column '{}' is not a number: '{}'",
                    row_index + 1,
                    names[col],
                    raw
                ))
            })?;
            values.push(value);
        }
    }

    let channels = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| AnalogSignal::new(name, Array1::from(values), sample_rate))
        .collect();
    AnalogData::new(sample_rate, frame_rate, channels)
}

/// Loads a trial directory holding `kinematics.csv`, `events.csv` and optionally `analog.csv`.
pub fn load_trial_dir(dir: &Path) -> Result<TrialData> {
    let kinematics = parse_kinematics(File::open(dir.join(KINEMATICS_FILE))?)?;
    let events = parse_events(File::open(dir.join(EVENTS_FILE))?)?;

    let analog_path = dir.join(ANALOG_FILE);
    let analog = if analog_path.exists() {
        Some(parse_analog(File::open(&analog_path)?, kinematics.frame_rate)?)
    } else {
        None
    };

    let name = kinematics.trial_name.clone().unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trial".to_string())
    });

    info!(
        "Loaded trial '{}': {} signals, {} events, {} analog channels, {:.1} Hz, ROI offset {}",
        name,
        kinematics.signals.len(),
        events.len(),
        analog.as_ref().map(|a| a.channels.len()).unwrap_or(0),
        kinematics.frame_rate,
        kinematics.roi_offset
    );

    Ok(TrialData {
        name,
        frame_rate: kinematics.frame_rate,
        roi_offset: kinematics.roi_offset,
        signals: kinematics.signals,
        events,
        analog,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinematics_with_metadata() {
        let content = "trial,walk01\nframe_rate,100\nroi_offset,40\n\nframe,LKneeAnglesX,RKneeAnglesX\n40,1.5,2.5\n41,1.6,\n42,1.7,2.7\n";
        let parsed = parse_kinematics(content.as_bytes()).unwrap();
        assert_eq!(parsed.trial_name.as_deref(), Some("walk01"));
        assert_eq!(parsed.frame_rate, 100.0);
        assert_eq!(parsed.roi_offset, 40);
        assert_eq!(parsed.signals.len(), 2);
        assert_eq!(parsed.signals[0].name, "LKneeAnglesX");
        assert_eq!(parsed.signals[0].values.to_vec(), vec![1.5, 1.6, 1.7]);
        assert!(parsed.signals[1].values[1].is_nan());
        assert_eq!(parsed.signals[1].offset, 40);
    }

    #[test]
    fn test_parse_kinematics_offset_from_first_frame() {
        let content = "frame,LHipAnglesX\n12,0.1\nbad,0.2\n13,0.3\n";
        let parsed = parse_kinematics(content.as_bytes()).unwrap();
        assert_eq!(parsed.roi_offset, 12);
        assert_eq!(parsed.frame_rate, DEFAULT_FRAME_RATE_HZ);
        assert_eq!(parsed.signals[0].values.to_vec(), vec![0.1, 0.3]);
    }

    #[test]
    fn test_parse_kinematics_without_header_fails() {
        let content = "frame_rate,100\n1,2,3\n";
        assert!(parse_kinematics(content.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_events() {
        let content = "side,kind,frame\nLeft,Foot Strike,50\nL,toe off,90\nRight,strike,85.0\nLeft,hop,100\nLeft,Foot Strike,120\n";
        let events = parse_events(content.as_bytes()).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events.strikes(Side::Left), vec![50, 120]);
        assert_eq!(events.toe_offs(Side::Left), vec![90]);
        assert_eq!(events.strikes(Side::Right), vec![85]);
    }

    #[test]
    fn test_parse_analog() {
        let content = "sample_rate,1000\nVoltage.LGas,Voltage.RGas\n0.1,0.2\n0.3,0.4\n";
        let analog = parse_analog(content.as_bytes(), 100.0).unwrap();
        assert_eq!(analog.sample_rate, 1000.0);
        assert_eq!(analog.samples_per_frame, 10.0);
        assert_eq!(analog.channel_names(), vec!["Voltage.LGas", "Voltage.RGas"]);
        assert_eq!(analog.channel("RGas").unwrap().values.to_vec(), vec![0.2, 0.4]);
    }

    #[test]
    fn test_parse_analog_rejects_bad_sample() {
        let content = "sample_rate,1000\nA\n0.1\nx\n";
        assert!(matches!(
            parse_analog(content.as_bytes(), 100.0),
            Err(GaitDataError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_analog_requires_sample_rate() {
        let content = "A,B\n0.1,0.2\n";
        assert!(parse_analog(content.as_bytes(), 100.0).is_err());
    }

    #[test]
    fn test_parse_analog_rejects_zero_frame_rate() {
        let content = "sample_rate,1000\nA\n0.1\n";
        assert!(matches!(
            parse_analog(content.as_bytes(), 0.0),
            Err(GaitDataError::InvalidParameter(_))
        ));
    }
}

// src/data_input/trial_parser.rs
