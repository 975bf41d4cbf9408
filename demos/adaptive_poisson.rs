use eyre::WrapErr;
use nalgebra::Point2;
use poisson_amr::adaptive::{AdaptiveConfig, AdaptiveLoop};
use poisson_amr::error::{estimate_L2_error, max_nodal_error};
use poisson_amr::problem::{ExactSolution, ManufacturedSineProblem};
use std::fs;

fn main() -> eyre::Result<()> {
    // Optionally read the configuration from a JSON file, e.g. `{ "cycles": 6, "strategy": "uniform" }`
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read config file {path}"))?;
            serde_json::from_str(&json).wrap_err("Failed to parse config")?
        }
        None => AdaptiveConfig::default().with_output_dir("data/adaptive_poisson"),
    };
    if let Some(output_dir) = &config.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let problem = ManufacturedSineProblem;
    let output = AdaptiveLoop::<f64, _>::new(config, problem)
        .wrap_err("Failed to set up adaptive loop")?
        .run_to_completion()
        .wrap_err("Adaptive loop failed")?;

    println!("cycle  vertices  triangles  CG its  marked  estimate");
    for report in &output.reports {
        println!(
            "{:>5}  {:>8}  {:>9}  {:>6}  {:>6}  {:.4e}",
            report.cycle,
            report.num_vertices,
            report.num_triangles,
            report.solver_iterations,
            report.num_marked,
            report.estimated_error
        );
    }

    let u_exact = |x: &Point2<f64>| problem.solution(x);
    let max_error = max_nodal_error(&output.mesh, &output.solution, u_exact);
    let l2_error = estimate_L2_error(&output.mesh, &output.solution, u_exact)?;
    println!("max nodal error: {max_error:.4e}");
    println!("L2 error:        {l2_error:.4e}");

    Ok(())
}
