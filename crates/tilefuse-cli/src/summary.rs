use console::Style;
use tilefuse_core::pipeline::StitchReport;
use tilefuse_core::project::Project;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    warn: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            warn: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_project_summary(project: &Project) {
    let s = Styles::new();
    let v = &project.volume;

    println!();
    println!("  {}", s.title.apply_to("Tilefuse Project"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!("  {}", s.header.apply_to("Volume"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Grid"),
        s.value.apply_to(format!("{} x {} tiles", v.rows, v.cols))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Tile"),
        s.value
            .apply_to(format!("{} x {} x {} voxels", v.tile_height, v.tile_width, v.depth))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Bit depth"),
        s.value
            .apply_to(format!("{}-bit, {} channel(s)", v.bit_depth, v.channels))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Overlap"),
        s.value
            .apply_to(format!("V = {}, H = {}", v.overlap_v, v.overlap_h))
    );
    if let Some(um) = v.voxel_um {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Voxel pitch"),
            s.value
                .apply_to(format!("{} x {} x {} um", um[0], um[1], um[2]))
        );
    }
    println!(
        "    {:<16}{}",
        s.label.apply_to("Tiles dir"),
        s.path.apply_to(v.tiles_dir.display())
    );
    println!();

    let p = &project.params;
    println!("  {}", s.header.apply_to("Parameters"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Search radius"),
        s.value.apply_to(format!(
            "V = {}, H = {}, D = {}",
            p.search_radius_v, p.search_radius_h, p.search_radius_d
        ))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("D-chunk"),
        s.value.apply_to(format!("{} slices", p.subvol_dim_d))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Reliability"),
        s.value.apply_to(p.reliability_threshold)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Enhancement"),
        s.value
            .apply_to(if p.ncc.enhance { "enabled" } else { "disabled" })
    );
    println!();
}

/// Print what the recorded phases have produced so far.
pub fn print_project_state(project: &Project) {
    let s = Styles::new();

    let candidates: usize = project.edges.iter().map(|e| e.candidates.len()).sum();
    let with_consensus = project.edges.iter().filter(|e| e.consensus.is_some()).count();
    let stitchable = project.tiles.iter().filter(|t| t.stitchable).count();
    let placed = project.tiles.iter().filter(|t| t.abs.is_some()).count();

    println!("  {}", s.header.apply_to("State"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Candidates"),
        s.value
            .apply_to(format!("{candidates} on {} edges", project.edges.len()))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Consensus"),
        s.value.apply_to(format!("{with_consensus} edges"))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Stitchable"),
        s.value.apply_to(format!("{stitchable} tiles"))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Placed"),
        s.value.apply_to(format!("{placed} tiles"))
    );
    if !project.failures.is_empty() {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Failures"),
            s.warn
                .apply_to(format!("{} pair chunks", project.failures.len()))
        );
    }
    println!();
}

pub fn print_stitch_report(report: &StitchReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Stitch Report"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Pairs"),
        s.value.apply_to(report.pairs)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Candidates"),
        s.value.apply_to(report.candidates)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Stitchable"),
        s.value.apply_to(report.stitchable_tiles)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Source"),
        s.value.apply_to(format!(
            "({}, {})",
            report.placement.source.0, report.placement.source.1
        ))
    );
    if report.placement.unreliable_steps > 0 {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Unreliable"),
            s.warn.apply_to(format!(
                "{} chain steps used fallback weights",
                report.placement.unreliable_steps
            ))
        );
    }
    if !report.failures.is_empty() {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Failures"),
            s.warn.apply_to(format!("{} pair chunks", report.failures.len()))
        );
    }
    println!();
}
