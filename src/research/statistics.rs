use std::fmt::Write;


/// Format how many retained filters read each channel.
///
/// ```text
/// # pair 0
/// green      12
/// sobel_x     3
/// ```
pub fn channel_usage_report<S: AsRef<str>>(
    label: &str,
    names: &[S],
    counts: &[usize],
) -> String
{
    let width = names.iter()
        .map(|name| name.as_ref().len())
        .max()
        .unwrap_or(0);
    let total = counts.iter().sum::<usize>().max(1);

    let mut report = format!("# {label}\n");
    for (name, count) in names.iter().zip(counts) {
        let share = 100.0 * *count as f64 / total as f64;
        let _ = writeln!(
            report,
            "{:<width$}  {count:>6}  ({share:>5.1}%)",
            name.as_ref(),
        );
    }
    report
}
