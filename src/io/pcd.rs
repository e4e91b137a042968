use super::*;
use nalgebra::Point3;
use std::io::{BufWriter, Write};

/// Loader for ASCII PCD files.
///
/// Only the `x`, `y` and `z` fields are read; other fields (intensity,
/// normals, colour) are skipped using the `COUNT` line to find column
/// offsets. Binary payloads are rejected.
pub struct PcdLoader;

/// Column layout parsed from the PCD header.
#[derive(Debug, Clone, PartialEq)]
struct PcdHeader {
    x_column: usize,
    y_column: usize,
    z_column: usize,
    columns: usize,
    points: Option<usize>,
}

impl PointCloudLoader for PcdLoader {
    fn load<P: AsRef<Path>>(path: P) -> Result<PointCloud, IoError> {
        parse_mapped(path, Self::parse_content)
    }

    fn write<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> Result<(), IoError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
        writeln!(writer, "VERSION 0.7")?;
        writeln!(writer, "FIELDS x y z")?;
        writeln!(writer, "SIZE 8 8 8")?;
        writeln!(writer, "TYPE F F F")?;
        writeln!(writer, "COUNT 1 1 1")?;
        writeln!(writer, "WIDTH {}", cloud.len())?;
        writeln!(writer, "HEIGHT 1")?;
        writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
        writeln!(writer, "POINTS {}", cloud.len())?;
        writeln!(writer, "DATA ascii")?;
        for p in cloud.points() {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl PcdLoader {
    fn parse_content(content: &str) -> Result<PointCloud, IoError> {
        let mut lines = content.lines().enumerate();
        let header = Self::parse_header(&mut lines)?;

        let mut cloud = PointCloud::with_capacity(header.points.unwrap_or(0));
        for (line_idx, line) in lines {
            let line_num = line_idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < header.columns {
                return Err(IoError::MissingFields { line: line_num });
            }

            let column = |col: usize| {
                parts
                    .get(col)
                    .ok_or(IoError::MissingFields { line: line_num })
                    .and_then(|value| parse_f64(value, line_num))
            };
            cloud.push(Point3::new(
                column(header.x_column)?,
                column(header.y_column)?,
                column(header.z_column)?,
            ));
        }

        if let Some(expected) = header.points
            && expected != cloud.len()
        {
            return Err(IoError::PointCountMismatch {
                expected,
                actual: cloud.len(),
            });
        }

        Ok(cloud)
    }

    /// Consume header lines up to and including `DATA`.
    fn parse_header<'a, I>(lines: &mut I) -> Result<PcdHeader, IoError>
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        let mut fields: Option<Vec<String>> = None;
        let mut counts: Option<Vec<usize>> = None;
        let mut points = None;

        for (line_idx, line) in lines.by_ref() {
            let line_num = line_idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0].to_uppercase().as_str() {
                "FIELDS" => {
                    fields = Some(parts[1..].iter().map(|f| f.to_lowercase()).collect());
                }
                "COUNT" => {
                    let parsed = parts[1..]
                        .iter()
                        .map(|c| {
                            c.parse::<usize>().map_err(|_| IoError::InvalidNumber {
                                line: line_num,
                                value: c.to_string(),
                            })
                        })
                        .collect::<Result<Vec<_>, IoError>>()?;
                    counts = Some(parsed);
                }
                "POINTS" => {
                    let value = parts.get(1).ok_or(IoError::MissingFields { line: line_num })?;
                    points = Some(value.parse::<usize>().map_err(|_| {
                        IoError::InvalidNumber {
                            line: line_num,
                            value: value.to_string(),
                        }
                    })?);
                }
                "DATA" => {
                    let encoding = parts.get(1).map(|s| s.to_lowercase()).unwrap_or_default();
                    if encoding != "ascii" {
                        return Err(IoError::UnsupportedFormat(format!(
                            "PCD data encoding '{encoding}' is not supported, only ascii"
                        )));
                    }
                    let fields = fields.ok_or_else(|| IoError::Parse {
                        line: line_num,
                        message: "DATA reached before FIELDS".to_string(),
                    })?;
                    return Self::layout(&fields, counts.as_deref(), points, line_num);
                }
                // VERSION, SIZE, TYPE, WIDTH, HEIGHT, VIEWPOINT carry nothing we need
                _ => {}
            }
        }

        Err(IoError::Parse {
            line: 0,
            message: "PCD header has no DATA line".to_string(),
        })
    }

    fn layout(
        fields: &[String],
        counts: Option<&[usize]>,
        points: Option<usize>,
        line_num: usize,
    ) -> Result<PcdHeader, IoError> {
        if let Some(counts) = counts
            && counts.len() != fields.len()
        {
            return Err(IoError::Parse {
                line: line_num,
                message: format!(
                    "COUNT has {} entries but FIELDS has {}",
                    counts.len(),
                    fields.len()
                ),
            });
        }

        if let Some(counts) = counts
            && let Some(i) = counts.iter().position(|&c| c == 0)
        {
            return Err(IoError::Parse {
                line: line_num,
                message: format!("COUNT of field '{}' is 0", fields[i]),
            });
        }

        let mut offsets = Vec::with_capacity(fields.len());
        let mut columns = 0;
        for i in 0..fields.len() {
            offsets.push(columns);
            columns += counts.map_or(1, |c| c[i]);
        }

        let column_of = |name: &str| {
            fields
                .iter()
                .position(|f| f == name)
                .map(|i| offsets[i])
                .ok_or_else(|| IoError::Parse {
                    line: line_num,
                    message: format!("PCD file has no '{name}' field"),
                })
        };

        Ok(PcdHeader {
            x_column: column_of("x")?,
            y_column: column_of("y")?,
            z_column: column_of("z")?,
            columns,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
DATA ascii";

    #[test]
    fn test_load_simple_pcd() -> Result<(), IoError> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "{HEADER}")?;
        writeln!(temp_file, "0.0 0.0 1.0")?;
        writeln!(temp_file, "1.5 -2.0 0.5")?;
        writeln!(temp_file, "3 4 5")?;

        let cloud = PcdLoader::load(temp_file.path())?;
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.points()[1], Point3::new(1.5, -2.0, 0.5));
        Ok(())
    }

    #[test]
    fn test_extra_fields_are_skipped() -> Result<(), IoError> {
        let content = "FIELDS intensity normal x y z
COUNT 1 3 1 1 1
POINTS 1
DATA ascii
0.9 0 0 1 7.0 8.0 9.0
";
        let cloud = PcdLoader::parse_content(content)?;
        assert_eq!(cloud.points(), &[Point3::new(7.0, 8.0, 9.0)]);
        Ok(())
    }

    #[test]
    fn test_point_count_mismatch() {
        let content = format!("{HEADER}\n0 0 0\n1 1 1\n");
        let result = PcdLoader::parse_content(&content);
        assert!(matches!(
            result,
            Err(IoError::PointCountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_binary_data_rejected() {
        let content = "FIELDS x y z\nPOINTS 0\nDATA binary\n";
        let result = PcdLoader::parse_content(content);
        assert!(matches!(result, Err(IoError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_z_field() {
        let content = "FIELDS x y\nDATA ascii\n";
        let result = PcdLoader::parse_content(content);
        assert!(matches!(result, Err(IoError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let content = "FIELDS x y z\nDATA ascii\n1 2 3\n1 two 3\n";
        let result = PcdLoader::parse_content(content);
        match result {
            Err(IoError::InvalidNumber { line, value }) => {
                assert_eq!(line, 4);
                assert_eq!(value, "two");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_short_row() {
        let content = "FIELDS x y z\nDATA ascii\n1 2\n";
        let result = PcdLoader::parse_content(content);
        assert!(matches!(result, Err(IoError::MissingFields { line: 3 })));
    }

    #[test]
    fn test_zero_count_rejected() {
        let content = "FIELDS x y z\nCOUNT 1 1 0\nDATA ascii\n1 2\n";
        let result = PcdLoader::parse_content(content);
        match result {
            Err(IoError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("'z'"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let result = PcdLoader::parse_content("");
        assert!(matches!(result, Err(IoError::Parse { .. })));
    }
}
