//! FIT workout file encoding.
//!
//! Writes the minimal message set a head unit needs to load a structured
//! workout: `file_id`, `workout` and one `workout_step` per interval.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use super::{ExportError, WorkoutFile, WorkoutStepRecord, WorkoutWriter};

/// FIT epoch offset: FIT timestamps are seconds since 1989-12-31 00:00:00 UTC
const FIT_EPOCH_OFFSET: i64 = 631065600;

const FIT_HEADER_SIZE: u8 = 14;

/// FIT protocol version 2.0
const FIT_PROTOCOL_VERSION: u8 = 0x20;

/// FIT profile version 21.00
const FIT_PROFILE_VERSION: u16 = 2100;

/// Shortest string field written; keeps definitions stable across names
const MIN_STRING_SIZE: usize = 16;

/// FIT field sizes are a single byte
const MAX_STRING_SIZE: usize = 255;

/// `message_index` is a u16 and 0xFFFF is the invalid marker
const MAX_STEPS: usize = 0xFFFE;

mod message_type {
    pub const FILE_ID: u16 = 0;
    pub const WORKOUT: u16 = 26;
    pub const WORKOUT_STEP: u16 = 27;
}

mod local_message {
    pub const FILE_ID: u8 = 0;
    pub const WORKOUT: u8 = 1;
    pub const WORKOUT_STEP: u8 = 2;
}

mod base_type {
    pub const ENUM: u8 = 0x00;
    pub const STRING: u8 = 0x07;
    pub const UINT16: u8 = 0x84;
    pub const UINT32: u8 = 0x86;
    pub const UINT32Z: u8 = 0x8C;
}

mod profile {
    pub const FILE_TYPE_WORKOUT: u8 = 5;
    pub const SPORT_CYCLING: u8 = 2;
    pub const SUB_SPORT_INDOOR_CYCLING: u8 = 6;
    pub const DURATION_TIME: u8 = 0;
    pub const TARGET_POWER_3S: u8 = 7;
    pub const MESSAGE_INDEX: u8 = 254;
}

/// Low level FIT record writer
struct FitWriter {
    buffer: Cursor<Vec<u8>>,
    data_size: u32,
}

impl FitWriter {
    fn new() -> Self {
        Self {
            buffer: Cursor::new(Vec::new()),
            data_size: 0,
        }
    }

    /// Header with a zero data size; `finalize` patches size and header CRC
    fn write_header(&mut self) -> Result<(), ExportError> {
        self.buffer.write_all(&[FIT_HEADER_SIZE, FIT_PROTOCOL_VERSION])?;
        self.buffer.write_all(&FIT_PROFILE_VERSION.to_le_bytes())?;
        self.buffer.write_all(&0u32.to_le_bytes())?;
        self.buffer.write_all(b".FIT")?;
        self.buffer.write_all(&0u16.to_le_bytes())?;
        Ok(())
    }

    /// Write a definition message
    fn write_definition(
        &mut self,
        local_mesg_num: u8,
        global_mesg_num: u16,
        fields: &[(u8, u8, u8)], // (field_def_num, size, base_type)
    ) -> Result<(), ExportError> {
        // Definition message: bit 6 set, local message number in bits 0-3
        self.write_byte(0x40 | (local_mesg_num & 0x0F))?;
        self.write_byte(0)?; // reserved
        self.write_byte(0)?; // little endian
        self.write_u16(global_mesg_num)?;
        self.write_byte(fields.len() as u8)?;

        for (field_num, size, base_type) in fields {
            self.write_byte(*field_num)?;
            self.write_byte(*size)?;
            self.write_byte(*base_type)?;
        }

        Ok(())
    }

    fn write_data_header(&mut self, local_mesg_num: u8) -> Result<(), ExportError> {
        self.write_byte(local_mesg_num & 0x0F)
    }

    fn write_byte(&mut self, value: u8) -> Result<(), ExportError> {
        self.write_bytes(&[value])
    }

    fn write_u16(&mut self, value: u16) -> Result<(), ExportError> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_u32(&mut self, value: u32) -> Result<(), ExportError> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.buffer.write_all(bytes)?;
        self.data_size += bytes.len() as u32;
        Ok(())
    }

    /// Null padded string occupying exactly `size` bytes
    fn write_string(&mut self, value: &str, size: u8) -> Result<(), ExportError> {
        let mut field = vec![0u8; size as usize];
        let text = truncate_utf8(value, size as usize - 1);
        field[..text.len()].copy_from_slice(text.as_bytes());
        self.write_bytes(&field)
    }

    fn datetime_to_fit_timestamp(dt: DateTime<Utc>) -> Result<u32, ExportError> {
        let seconds = dt.timestamp() - FIT_EPOCH_OFFSET;
        u32::try_from(seconds).map_err(|_| ExportError::FieldOutOfRange {
            field: "time_created",
            value: seconds,
        })
    }

    /// Patch data size and header CRC, then append the file CRC
    fn finalize(self) -> Result<Vec<u8>, ExportError> {
        let data_size = self.data_size;
        let mut data = self.buffer.into_inner();

        data[4..8].copy_from_slice(&data_size.to_le_bytes());
        let header_crc = calculate_crc(&data[0..12]);
        data[12..14].copy_from_slice(&header_crc.to_le_bytes());

        let file_crc = calculate_crc(&data[..]);
        data.extend_from_slice(&file_crc.to_le_bytes());

        Ok(data)
    }
}

/// CRC-16 as defined by the FIT SDK
fn calculate_crc(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    let crc_table: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    for byte in data {
        let tmp = crc_table[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ crc_table[(*byte & 0xF) as usize];

        let tmp = crc_table[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ crc_table[((*byte >> 4) & 0xF) as usize];
    }

    crc
}

fn truncate_utf8(value: &str, max_len: usize) -> &str {
    if value.len() <= max_len {
        return value;
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Field size for a set of strings, including the terminating null
fn string_field_size<'a>(values: impl Iterator<Item = &'a str>) -> u8 {
    let longest = values.map(str::len).max().unwrap_or(0);
    (longest + 1).clamp(MIN_STRING_SIZE, MAX_STRING_SIZE) as u8
}

/// Encode a workout as a complete FIT file
pub fn encode_workout(workout: &WorkoutFile) -> Result<Vec<u8>, ExportError> {
    if workout.steps.len() > MAX_STEPS {
        return Err(ExportError::TooManySteps {
            workout: workout.name.clone(),
            count: workout.steps.len(),
        });
    }

    let mut writer = FitWriter::new();
    writer.write_header()?;
    write_file_id(&mut writer, workout)?;
    write_workout(&mut writer, workout)?;
    write_steps(&mut writer, &workout.steps)?;
    writer.finalize()
}

fn write_file_id(writer: &mut FitWriter, workout: &WorkoutFile) -> Result<(), ExportError> {
    let fields = [
        (0, 1, base_type::ENUM),    // type
        (1, 2, base_type::UINT16),  // manufacturer
        (2, 2, base_type::UINT16),  // product
        (3, 4, base_type::UINT32Z), // serial_number
        (4, 4, base_type::UINT32),  // time_created
    ];
    writer.write_definition(local_message::FILE_ID, message_type::FILE_ID, &fields)?;

    writer.write_data_header(local_message::FILE_ID)?;
    writer.write_byte(profile::FILE_TYPE_WORKOUT)?;
    writer.write_u16(workout.device.manufacturer)?;
    writer.write_u16(workout.device.product)?;
    writer.write_u32(workout.device.serial_number)?;
    writer.write_u32(FitWriter::datetime_to_fit_timestamp(workout.time_created)?)?;

    Ok(())
}

fn write_workout(writer: &mut FitWriter, workout: &WorkoutFile) -> Result<(), ExportError> {
    let name_size = string_field_size(std::iter::once(workout.name.as_str()));
    let fields = [
        (4, 1, base_type::ENUM),          // sport
        (6, 2, base_type::UINT16),        // num_valid_steps
        (8, name_size, base_type::STRING), // wkt_name
        (11, 1, base_type::ENUM),         // sub_sport
    ];
    writer.write_definition(local_message::WORKOUT, message_type::WORKOUT, &fields)?;

    writer.write_data_header(local_message::WORKOUT)?;
    writer.write_byte(profile::SPORT_CYCLING)?;
    writer.write_u16(workout.steps.len() as u16)?;
    writer.write_string(&workout.name, name_size)?;
    writer.write_byte(profile::SUB_SPORT_INDOOR_CYCLING)?;

    Ok(())
}

fn write_steps(writer: &mut FitWriter, steps: &[WorkoutStepRecord]) -> Result<(), ExportError> {
    if steps.is_empty() {
        return Ok(());
    }

    let name_size = string_field_size(steps.iter().map(|s| s.name.as_str()));
    let fields = [
        (profile::MESSAGE_INDEX, 2, base_type::UINT16), // message_index
        (0, name_size, base_type::STRING),               // wkt_step_name
        (1, 1, base_type::ENUM),                         // duration_type
        (2, 4, base_type::UINT32),                       // duration_value (ms)
        (3, 1, base_type::ENUM),                         // target_type
        (4, 4, base_type::UINT32),                       // target_value
        (5, 4, base_type::UINT32),                       // custom_target_value_low
        (6, 4, base_type::UINT32),                       // custom_target_value_high
        (7, 1, base_type::ENUM),                         // intensity
    ];
    writer.write_definition(local_message::WORKOUT_STEP, message_type::WORKOUT_STEP, &fields)?;

    for (index, step) in steps.iter().enumerate() {
        writer.write_data_header(local_message::WORKOUT_STEP)?;
        writer.write_u16(index as u16)?;
        writer.write_string(&step.name, name_size)?;
        writer.write_byte(profile::DURATION_TIME)?;
        writer.write_u32(step.duration_ms)?;
        writer.write_byte(profile::TARGET_POWER_3S)?;
        writer.write_u32(0)?; // must be 0 for custom targets
        writer.write_u32(step.custom_power_low)?;
        writer.write_u32(step.custom_power_high)?;
        writer.write_byte(step.intensity.fit_value())?;
    }

    Ok(())
}

/// Writes `{name}_workout.fit` files into a directory
#[derive(Debug, Clone)]
pub struct FitFileWriter {
    output_dir: PathBuf,
}

impl FitFileWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl WorkoutWriter for FitFileWriter {
    fn write(&mut self, workout: &WorkoutFile) -> Result<PathBuf, ExportError> {
        let content = encode_workout(workout)?;

        fs::create_dir_all(&self.output_dir).map_err(|e| ExportError::ExportFailed {
            path: self.output_dir.clone(),
            reason: e.to_string(),
        })?;

        let path = self.output_dir.join(workout.file_name());
        fs::write(&path, content)?;
        tracing::info!(
            path = %path.display(),
            steps = workout.steps.len(),
            "Wrote workout file"
        );
        Ok(path)
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{DeviceInfo, Intensity};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn step(name: &str, duration_ms: u32, power: u32) -> WorkoutStepRecord {
        WorkoutStepRecord {
            name: name.to_string(),
            intensity: Intensity::Other,
            duration_ms,
            custom_power_low: power,
            custom_power_high: power,
        }
    }

    fn workout(steps: Vec<WorkoutStepRecord>) -> WorkoutFile {
        WorkoutFile {
            name: "w_1_a".to_string(),
            steps,
            time_created: Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(),
            device: DeviceInfo::default(),
        }
    }

    #[test]
    fn test_encode_workout_generates_valid_header() {
        let data = encode_workout(&workout(vec![step("Step 1", 600_000, 1110)])).unwrap();

        assert_eq!(data[0], 14);
        assert_eq!(data[1], 0x20);
        assert_eq!(&data[8..12], b".FIT");

        let data_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        assert_eq!(data.len(), 14 + data_size + 2);

        let header_crc = u16::from_le_bytes([data[12], data[13]]);
        assert_eq!(header_crc, calculate_crc(&data[0..12]));
    }

    #[test]
    fn test_file_crc_checks_out() {
        let data = encode_workout(&workout(vec![step("Step 1", 60_000, 1200)])).unwrap();
        // CRC over the whole file including its own trailing CRC is zero
        assert_eq!(calculate_crc(&data), 0);
    }

    #[test]
    fn test_step_values_are_little_endian_in_payload() {
        let data = encode_workout(&workout(vec![step("Step 1", 600_000, 1110)])).unwrap();
        let payload = &data[14..data.len() - 2];

        let power = 1110u32.to_le_bytes();
        let duration = 600_000u32.to_le_bytes();
        assert!(payload.windows(4).any(|w| w == duration));
        assert_eq!(payload.windows(8).filter(|w| w[..4] == power && w[4..] == power).count(), 1);
    }

    #[test]
    fn test_empty_workout_still_encodes() {
        let data = encode_workout(&workout(vec![])).unwrap();
        assert_eq!(calculate_crc(&data), 0);
    }

    #[test]
    fn test_datetime_to_fit_timestamp() {
        let dt = Utc.with_ymd_and_hms(1989, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(FitWriter::datetime_to_fit_timestamp(dt).unwrap(), 0);

        let dt = Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(FitWriter::datetime_to_fit_timestamp(dt).unwrap(), 86400);

        let dt = Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).unwrap();
        assert!(FitWriter::datetime_to_fit_timestamp(dt).is_err());
    }

    #[test]
    fn test_string_field_size() {
        assert_eq!(string_field_size(["a"].into_iter()), MIN_STRING_SIZE as u8);
        let long = "x".repeat(40);
        assert_eq!(string_field_size([long.as_str()].into_iter()), 41);
        let huge = "x".repeat(400);
        assert_eq!(string_field_size([huge.as_str()].into_iter()), 255);
    }

    #[test]
    fn test_truncate_utf8_respects_char_boundaries() {
        assert_eq!(truncate_utf8("abc", 10), "abc");
        assert_eq!(truncate_utf8("abcdef", 3), "abc");
        assert_eq!(truncate_utf8("añb", 2), "a");
    }

    #[test]
    fn test_writer_creates_output_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("output");
        let mut writer = FitFileWriter::new(&out);

        let path = writer.write(&workout(vec![step("Step 1", 60_000, 1100)])).unwrap();

        assert_eq!(path, out.join("w_1_a_workout.fit"));
        assert!(path.exists());
        assert_eq!(writer.output_dir(), out.as_path());
    }
}
