use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gridworld::render::*;
use gridworld::*;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rl::algos::model_based::vi::*;
use rl::algos::model_free::q_learning::*;
use rl::config::*;
use rl::envs::smart_train::*;
use rl::mdps::{markov_chain::*, mdp_simulator::*};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rl", version, about = "Plan and learn in grid-world MDPs")]
struct Cli {
    /// Solver settings as JSON; flags override individual fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random draw.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimal values and policy of a map.
    ValueIteration {
        /// Path or http(s) URL of a `.mdp` map.
        map: MapSource,
        #[command(flatten)]
        vi: ValueIterationArgs,
    },
    /// Greedy policy learned by tabular Q-learning.
    QLearning {
        map: MapSource,
        #[command(flatten)]
        ql: QLearningArgs,
    },
    /// Run one episode under a policy.
    Simulate {
        map: MapSource,
        #[arg(long, value_enum, default_value_t = PolicyKind::ValueIteration)]
        policy: PolicyKind,
        /// Start cell as `x,y`.
        #[arg(long, value_parser = parse_cell, default_value = "0,0")]
        start: Cell,
        #[arg(long)]
        max_steps: Option<usize>,
        #[command(flatten)]
        vi: ValueIterationArgs,
        #[command(flatten)]
        ql: QLearningArgs,
    },
    /// Solve a finite MDP given as JSON; the 3-state train example by default.
    PolicyIteration {
        mdp: Option<PathBuf>,
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,
    },
    /// Evolve the 2-state example chain and find its stationary distribution.
    MarkovChain {
        #[arg(long, default_value_t = 10)]
        steps: usize,
    },
}

#[derive(Args)]
struct ValueIterationArgs {
    #[arg(long)]
    gamma: Option<f64>,
    #[arg(long)]
    epsilon: Option<f64>,
    #[arg(long)]
    max_iterations: Option<usize>,
    #[arg(long)]
    include_terminal: bool,
}

impl ValueIterationArgs {
    fn apply(&self, c: &mut ValueIterationConfig) {
        c.gamma = self.gamma.unwrap_or(c.gamma);
        c.epsilon = self.epsilon.unwrap_or(c.epsilon);
        c.max_iterations = self.max_iterations.or(c.max_iterations);
        c.include_terminal |= self.include_terminal;
    }
}

#[derive(Args)]
struct QLearningArgs {
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long = "q-gamma")]
    q_gamma: Option<f64>,
    #[arg(long)]
    episodes: Option<usize>,
    #[arg(long)]
    steps: Option<usize>,
}

impl QLearningArgs {
    fn apply(&self, c: &mut QLearningConfig) {
        c.alpha = self.alpha.unwrap_or(c.alpha);
        c.gamma = self.q_gamma.unwrap_or(c.gamma);
        c.episodes = self.episodes.unwrap_or(c.episodes);
        c.steps = self.steps.unwrap_or(c.steps);
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyKind {
    ValueIteration,
    QLearning,
    Random,
}

fn parse_cell(s: &str) -> std::result::Result<Cell, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<Discrete>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    match parts[..] {
        [x, y] => Ok(Cell::new(x, y)),
        _ => Err(format!("expected `x,y`, got {} values", parts.len())),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SolverConfig::load(path)
            .with_context(|| format!("Cannot load solver config {}", path.display()))?,
        None => SolverConfig::default(),
    };
    config.seed = cli.seed.or(config.seed);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match cli.cmd {
        Commands::ValueIteration { map, vi } => {
            vi.apply(&mut config.value_iteration);
            let world = map.load().with_context(|| format!("Cannot load map {map}"))?;
            value_iteration(&world, &config.value_iteration, cli.json)
        }
        Commands::QLearning { map, ql } => {
            ql.apply(&mut config.q_learning);
            let world = map.load().with_context(|| format!("Cannot load map {map}"))?;
            let policy = QLearning::new(&world, config.q_learning.clone())?.run(&mut rng)?;
            print_policy(&world, &policy, cli.json);
            Ok(())
        }
        Commands::Simulate {
            map,
            policy,
            start,
            max_steps,
            vi,
            ql,
        } => {
            vi.apply(&mut config.value_iteration);
            ql.apply(&mut config.q_learning);
            config.simulation.max_steps = max_steps.unwrap_or(config.simulation.max_steps);
            let world = map.load().with_context(|| format!("Cannot load map {map}"))?;

            let pi = match policy {
                PolicyKind::ValueIteration => {
                    let mut vi = ValueIteration::new(&world, config.value_iteration.clone())?;
                    vi.exec().into_converged()?;
                    vi.policy()
                }
                PolicyKind::QLearning => {
                    QLearning::new(&world, config.q_learning.clone())?.run(&mut rng)?
                }
                PolicyKind::Random => world.random_policy(&mut rng),
            };
            let rollout = simulate(&world, &pi, start, config.simulation.max_steps, &mut rng)
                .with_context(|| format!("Cannot simulate from {start}"))?;
            info!(steps = rollout.cells.len() - 1, "Simulation finished");

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rollout)?);
            } else {
                println!("{}", render_trajectory(&world, &rollout.cells));
                println!("cumulative reward: {:.4}", rollout.cumulative_reward);
            }
            Ok(())
        }
        Commands::PolicyIteration {
            mdp,
            max_iterations,
        } => {
            let mdp = match mdp {
                Some(path) => FiniteMdpFile::load(&path)
                    .and_then(FiniteMdpFile::into_mdp)
                    .with_context(|| format!("Cannot load MDP {}", path.display()))?,
                None => smart_train(REWARDS, GAMMA)?,
            };
            let pi0 = vec![0; mdp.n_s()];
            let outcome = mdp.policy_iteration(pi0, max_iterations)?;
            let iterations = outcome.iterations;
            let solution = outcome.into_converged()?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "iterations": iterations,
                        "policy": solution.policy,
                        "values": solution.values,
                    }))?
                );
            } else {
                println!("iterations: {iterations}");
                println!("policy: {:?}", solution.policy);
                println!("values: {:?}", solution.values);
            }
            Ok(())
        }
        Commands::MarkovChain { steps } => {
            let chain = MarkovChain::from_rows(2, &[0.3, 0.6, 0.7, 0.4])?;
            let history = chain
                .evolve(DVector::from_vec(vec![1., 0.]))?
                .take(steps + 1)
                .map(|x| x.iter().copied().collect::<Vec<_>>())
                .collect::<Vec<_>>();
            let stationary = chain.stationary_distribution()?;
            let stationary = stationary.iter().copied().collect::<Vec<_>>();

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "history": history,
                        "stationary": stationary,
                    }))?
                );
            } else {
                for (t, x) in history.iter().enumerate() {
                    println!("x(t+{t}) = {x:?}");
                }
                println!("stationary = {stationary:?}");
            }
            Ok(())
        }
    }
}

fn value_iteration(world: &GridWorld, config: &ValueIterationConfig, as_json: bool) -> Result<()> {
    let mut vi = ValueIteration::new(world, config.clone())?;
    let outcome = vi.exec();
    let (iterations, residual) = (outcome.iterations, outcome.residual);
    let values = outcome.into_converged()?;
    let policy = vi.policy();

    if as_json {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by_key(|(c, _)| *c);
        let values = values
            .into_iter()
            .map(|(cell, value)| json!({ "cell": cell, "value": value }))
            .collect::<Vec<_>>();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "iterations": iterations,
                "residual": residual,
                "values": values,
                "policy": policy_json(&policy),
            }))?
        );
    } else {
        println!("{world}");
        println!("iterations: {iterations}, residual: {residual:.3e}");
        println!("values:\n{}", render_values(world, &values));
        println!("policy:\n{}", render_policy(world, &policy));
    }

    Ok(())
}

fn policy_json(policy: &TabularPolicy) -> serde_json::Value {
    policy
        .to_sorted_vec()
        .into_iter()
        .map(|(cell, action)| json!({ "cell": cell, "action": action }))
        .collect()
}

fn print_policy(world: &GridWorld, policy: &TabularPolicy, as_json: bool) {
    if as_json {
        println!("{}", policy_json(policy));
    } else {
        println!("{}", render_policy(world, policy));
    }
}
