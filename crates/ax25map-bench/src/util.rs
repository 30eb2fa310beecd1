/// Synthesize a monitor log with `frame_count` frames over a mesh of
/// `station_count` stations. Every third frame is heard direct, the rest
/// travel through up to three digipeaters with a partly used path.
pub fn generate_synthetic_log(frame_count: usize, station_count: usize) -> Vec<String> {
    let station_count = station_count.max(4);
    let call = |i: usize| format!("N{}AB", i % station_count);
    let mut lines = Vec::with_capacity(frame_count * 2);

    for i in 0..frame_count {
        let source = call(i * 7);
        let minute = (i / 60) % 60;
        let second = i % 60;
        let prefix = format!("2024-03-01 18:{minute:02}:{second:02}");

        if i % 3 == 0 {
            lines.push(format!("{prefix} fm {source} to BEACON ctl UI pid=F0(Text) len 20"));
        } else {
            let hops = 1 + i % 3;
            let used = i % hops;
            let path: Vec<String> = (0..hops)
                .map(|h| {
                    let marker = if h < used { "*" } else { "" };
                    format!("{}{marker}", call(i * 7 + h * 3 + 1))
                })
                .collect();
            lines.push(format!(
                "{prefix} fm {source} to CQ via {} ctl UI pid=F0(Text) len 12",
                path.join(" ")
            ));
        }
        lines.push(format!("0000  96 88 64 a8 9e 40 e0 {:02x}", i % 256));
        lines.push(format!("{source} status report {i}"));
    }
    lines
}
