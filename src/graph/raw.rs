use std::fmt;

use super::ProfileGraph;

// Mirrors the layout of `pprof -raw`: header fields, samples, then the location and
// mapping tables.
impl fmt::Display for ProfileGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pt) = &self.period_type {
            writeln!(f, "PeriodType: {} {}", pt.kind, pt.unit)?;
        }
        writeln!(f, "Period: {}", self.period)?;
        if self.time_nanos != 0 {
            writeln!(f, "Time: {}", self.time_nanos)?;
        }
        if self.duration_nanos != 0 {
            writeln!(f, "Duration: {}", self.duration_nanos)?;
        }
        for comment in &self.comments {
            writeln!(f, "Comment: {}", comment)?;
        }

        writeln!(f, "Samples:")?;
        let header: Vec<String> = self.sample_types.iter().map(|st| st.to_string()).collect();
        writeln!(f, "{}", header.join(" "))?;
        for sample in &self.samples {
            for v in &sample.values {
                write!(f, " {:>10}", v)?;
            }
            write!(f, ":")?;
            for loc in &sample.locations {
                write!(f, " {}", loc)?;
            }
            writeln!(f)?;
            for (key, values) in &sample.labels {
                writeln!(f, "{:>12}{}:[{}]", "", key, values.join(" "))?;
            }
            for (key, values) in &sample.numeric_labels {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                writeln!(f, "{:>12}{}:[{}]", "", key, values.join(" "))?;
            }
        }

        writeln!(f, "Locations")?;
        for loc in self.locations() {
            write!(f, "{:>6}: {:#x}", loc.id, loc.address.unwrap_or(0))?;
            if let Some(m) = loc.mapping {
                write!(f, " M={}", m)?;
            }
            let mut first = true;
            for line in &loc.lines {
                if !first {
                    write!(f, "\n{:>22}", "")?;
                }
                first = false;
                match self.function(line.function) {
                    Some(func) => {
                        write!(f, " {} {}:{}", func.name, func.filename, line.line)?;
                        if func.start_line != 0 {
                            write!(f, " s={}", func.start_line)?;
                        }
                    }
                    None => write!(f, " ??")?,
                }
            }
            writeln!(f)?;
        }

        writeln!(f, "Mappings")?;
        for m in self.mappings() {
            write!(
                f,
                "{}: {:#x}/{:#x}/{:#x} {}",
                m.id, m.start, m.limit, m.offset, m.file
            )?;
            if !m.build_id.is_empty() {
                write!(f, " {}", m.build_id)?;
            }
            if m.has_functions {
                write!(f, " [FN]")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
