mod error;
mod io;
mod solver;
