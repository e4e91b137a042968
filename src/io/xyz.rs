use super::*;
use nalgebra::Point3;
use rayon::prelude::*;
use std::io::{BufWriter, Write};

/// Loader for plain `x y z` text files, one point per line.
///
/// Blank lines and lines starting with `#` are ignored. Columns past the third
/// are ignored too, so `x y z r g b` exports load without conversion.
pub struct XyzLoader;

impl PointCloudLoader for XyzLoader {
    fn load<P: AsRef<Path>>(path: P) -> Result<PointCloud, IoError> {
        parse_mapped(path, Self::parse_content)
    }

    fn write<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> Result<(), IoError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for p in cloud.points() {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl XyzLoader {
    fn parse_content(content: &str) -> Result<PointCloud, IoError> {
        let lines: Vec<&str> = content.lines().collect();

        let parsed: Vec<Option<Point3<f64>>> = if lines.len() > 5000 {
            lines
                .par_iter()
                .enumerate()
                .map(|(line_idx, line)| Self::parse_line(line, line_idx + 1))
                .collect::<Result<Vec<_>, IoError>>()?
        } else {
            lines
                .iter()
                .enumerate()
                .map(|(line_idx, line)| Self::parse_line(line, line_idx + 1))
                .collect::<Result<Vec<_>, IoError>>()?
        };

        Ok(parsed.into_iter().flatten().collect())
    }

    fn parse_line(line: &str, line_num: usize) -> Result<Option<Point3<f64>>, IoError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(IoError::MissingFields { line: line_num });
        }

        Ok(Some(Point3::new(
            parse_f64(parts[0], line_num)?,
            parse_f64(parts[1], line_num)?,
            parse_f64(parts[2], line_num)?,
        )))
    }
}
