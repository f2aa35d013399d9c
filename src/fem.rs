// src/fem.rs - Built-in finite-element collaborator: uniform 1-D mesh,
// linear elements, theta-weighted transient assembly and a conjugate-gradient
// solve. The controller decides the coefficients; this module owns the
// discretization.
//
// All matrices are symmetric tridiagonal. Buffers are allocated once per
// system and re-zeroed each assembly because the coefficients change every
// fixed-point iteration.

use crate::error::SimulationError;

/// Euclidean norm of a nodal field.
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Uniform mesh on the column [-domain_size, 0]. Node 0 sits at the bottom,
/// the last node at the surface; cell count is 2^refinement_level, matching
/// a globally refined unit interval.
#[derive(Debug, Clone, Copy)]
pub struct Mesh1d {
    domain_size_m: f64,
    n_cells: usize,
    cell_size_m: f64,
}

impl Mesh1d {
    pub fn new(domain_size_m: f64, refinement_level: u32) -> Result<Self, SimulationError> {
        if domain_size_m <= 0.0 {
            return Err(SimulationError::config(format!(
                "domain size {domain_size_m} must be positive"
            )));
        }
        if refinement_level == 0 || refinement_level > 24 {
            return Err(SimulationError::config(format!(
                "refinement level {refinement_level} outside supported range 1..=24"
            )));
        }
        let n_cells = 1usize << refinement_level;
        Ok(Mesh1d {
            domain_size_m,
            n_cells,
            cell_size_m: domain_size_m / n_cells as f64,
        })
    }

    pub fn domain_size_m(&self) -> f64 {
        self.domain_size_m
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn n_nodes(&self) -> usize {
        self.n_cells + 1
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    /// Coordinate of node `i`; node 0 is the bottom of the column.
    pub fn node_x(&self, i: usize) -> f64 {
        -self.domain_size_m + i as f64 * self.cell_size_m
    }

    pub fn cell_center(&self, e: usize) -> f64 {
        -self.domain_size_m + (e as f64 + 0.5) * self.cell_size_m
    }

    /// Index of the cell containing `x`, with the shared node between two
    /// cells belonging to the cell on its right (shallower side).
    pub fn containing_cell(&self, x: f64) -> Result<usize, SimulationError> {
        if x < -self.domain_size_m - 1e-12 || x > 1e-12 {
            return Err(SimulationError::PositionOutOfRange { position_m: x });
        }
        let offset = (x + self.domain_size_m) / self.cell_size_m;
        Ok((offset.floor() as usize).min(self.n_cells - 1))
    }
}

/// Symmetric tridiagonal matrix stored as a main diagonal plus one
/// off-diagonal.
#[derive(Debug, Clone)]
pub struct TriDiagMatrix {
    diag: Vec<f64>,
    off: Vec<f64>,
}

impl TriDiagMatrix {
    pub fn zeros(n: usize) -> Self {
        TriDiagMatrix {
            diag: vec![0.0; n],
            off: vec![0.0; n.saturating_sub(1)],
        }
    }

    pub fn n(&self) -> usize {
        self.diag.len()
    }

    pub fn reset(&mut self) {
        self.diag.fill(0.0);
        self.off.fill(0.0);
    }

    /// Accumulate a symmetric 2x2 element matrix for cell `e` (nodes e and
    /// e+1).
    pub fn add_element(&mut self, e: usize, m: [[f64; 2]; 2]) {
        self.diag[e] += m[0][0];
        self.diag[e + 1] += m[1][1];
        self.off[e] += m[0][1];
    }

    pub fn add_diag(&mut self, i: usize, value: f64) {
        self.diag[i] += value;
    }

    pub fn copy_from(&mut self, other: &TriDiagMatrix) {
        self.diag.copy_from_slice(&other.diag);
        self.off.copy_from_slice(&other.off);
    }

    /// self += factor * other
    pub fn add_scaled(&mut self, factor: f64, other: &TriDiagMatrix) {
        for (d, o) in self.diag.iter_mut().zip(&other.diag) {
            *d += factor * o;
        }
        for (d, o) in self.off.iter_mut().zip(&other.off) {
            *d += factor * o;
        }
    }

    /// y = A x
    pub fn vmult(&self, x: &[f64], y: &mut [f64]) {
        let n = self.n();
        for i in 0..n {
            let mut v = self.diag[i] * x[i];
            if i > 0 {
                v += self.off[i - 1] * x[i - 1];
            }
            if i + 1 < n {
                v += self.off[i] * x[i + 1];
            }
            y[i] = v;
        }
    }

    /// Symmetric Dirichlet elimination: constrain `node` to `value`, moving
    /// the coupled entries to the right-hand side so the matrix stays
    /// symmetric positive definite for CG.
    pub fn apply_dirichlet(&mut self, rhs: &mut [f64], node: usize, value: f64) {
        let n = self.n();
        if node > 0 {
            rhs[node - 1] -= self.off[node - 1] * value;
            self.off[node - 1] = 0.0;
        }
        if node + 1 < n {
            rhs[node + 1] -= self.off[node] * value;
            self.off[node] = 0.0;
        }
        // Keep the existing diagonal so the constrained row stays on the
        // same scale as its neighbours.
        if self.diag[node] == 0.0 {
            self.diag[node] = 1.0;
        }
        rhs[node] = self.diag[node] * value;
    }
}

/// The assembled transient heat system for one column.
///
/// Owns the mesh, the mass and stiffness matrices at both time levels, the
/// combined system matrix and all solver scratch space. Matrices are
/// re-zeroed and reassembled each fixed-point iteration.
pub struct HeatSystem {
    mesh: Mesh1d,
    mass: TriDiagMatrix,
    laplace_new: TriDiagMatrix,
    laplace_old: TriDiagMatrix,
    system: TriDiagMatrix,
    rhs: Vec<f64>,
    tmp: Vec<f64>,
    cg_r: Vec<f64>,
    cg_p: Vec<f64>,
    cg_ap: Vec<f64>,
}

impl HeatSystem {
    pub fn new(mesh: Mesh1d) -> Self {
        let n = mesh.n_nodes();
        HeatSystem {
            mesh,
            mass: TriDiagMatrix::zeros(n),
            laplace_new: TriDiagMatrix::zeros(n),
            laplace_old: TriDiagMatrix::zeros(n),
            system: TriDiagMatrix::zeros(n),
            rhs: vec![0.0; n],
            tmp: vec![0.0; n],
            cg_r: vec![0.0; n],
            cg_p: vec![0.0; n],
            cg_ap: vec![0.0; n],
        }
    }

    pub fn mesh(&self) -> &Mesh1d {
        &self.mesh
    }

    pub fn n_dofs(&self) -> usize {
        self.mesh.n_nodes()
    }

    pub fn top_node(&self) -> usize {
        self.mesh.n_cells()
    }

    pub fn bottom_node(&self) -> usize {
        0
    }

    /// Zero all matrices and the right-hand side before reassembly.
    pub fn begin_assembly(&mut self) {
        self.mass.reset();
        self.laplace_new.reset();
        self.laplace_old.reset();
        self.rhs.fill(0.0);
    }

    /// Accumulate one cell's mass and stiffness contributions plus a
    /// theta-weighted volumetric source density (W/m3) on the right-hand
    /// side.
    pub fn add_cell(
        &mut self,
        e: usize,
        thermal_conductivity: f64,
        volumetric_heat_capacity: f64,
        source_density_old: f64,
        source_density_new: f64,
        theta: f64,
        time_step_s: f64,
    ) {
        let h = self.mesh.cell_size_m();

        // Lumped mass matrix: the row sum of the consistent linear-element
        // matrix, c*h/2 per node. The consistent matrix breaks the discrete
        // maximum principle when k*dt/(c*h^2) < 1/6; lumping keeps the theta
        // scheme monotone at every step size.
        let mc = volumetric_heat_capacity * h / 2.0;
        self.mass.add_diag(e, mc);
        self.mass.add_diag(e + 1, mc);

        // Stiffness: k/h * [[1,-1],[-1,1]], same coefficients at both time
        // levels (they are evaluated at the theta-blended field).
        let kc = thermal_conductivity / h;
        self.laplace_new.add_element(e, [[kc, -kc], [-kc, kc]]);
        self.laplace_old.add_element(e, [[kc, -kc], [-kc, kc]]);

        let weighted =
            source_density_new * theta * time_step_s + source_density_old * (1.0 - theta) * time_step_s;
        let load = weighted * h / 2.0;
        self.rhs[e] += load;
        self.rhs[e + 1] += load;
    }

    /// Top-surface boundary terms: an outbound convective coefficient on the
    /// matrix diagonal (zero for a pure flux condition) and theta-weighted
    /// inbound fluxes on the right-hand side. In 1-D the surface integral is
    /// a point evaluation at the top node.
    pub fn add_top_boundary_terms(
        &mut self,
        outbound_coefficient: f64,
        inbound_flux_old: f64,
        inbound_flux_new: f64,
        theta: f64,
        time_step_s: f64,
    ) {
        let top = self.top_node();
        if outbound_coefficient != 0.0 {
            self.laplace_new.add_diag(top, outbound_coefficient);
            self.laplace_old.add_diag(top, outbound_coefficient);
        }
        self.rhs[top] += inbound_flux_new * theta * time_step_s
            + inbound_flux_old * (1.0 - theta) * time_step_s;
    }

    /// Unit point-source vector at `x`: the shape-function values of the
    /// containing cell's two nodes.
    pub fn point_source_vector(&self, x: f64) -> Result<Vec<f64>, SimulationError> {
        let e = self.mesh.containing_cell(x)?;
        let local = (x - self.mesh.node_x(e)) / self.mesh.cell_size_m();
        let mut v = vec![0.0; self.n_dofs()];
        v[e] = 1.0 - local;
        v[e + 1] = local;
        Ok(v)
    }

    /// Add `magnitude * source_vector` to the right-hand side.
    pub fn add_point_source(&mut self, source_vector: &[f64], magnitude: f64) {
        for (r, s) in self.rhs.iter_mut().zip(source_vector) {
            *r += magnitude * s;
        }
    }

    /// Combine the assembled pieces into the theta-weighted system:
    ///   system = M + theta*dt*K_new
    ///   rhs   += M*T_old - (1 - theta)*dt*K_old*T_old
    pub fn finalize(&mut self, old_solution: &[f64], theta: f64, time_step_s: f64) {
        self.mass.vmult(old_solution, &mut self.tmp);
        for (r, t) in self.rhs.iter_mut().zip(&self.tmp) {
            *r += t;
        }
        self.laplace_old.vmult(old_solution, &mut self.tmp);
        let factor = -(1.0 - theta) * time_step_s;
        for (r, t) in self.rhs.iter_mut().zip(&self.tmp) {
            *r += factor * t;
        }

        self.system.copy_from(&self.mass);
        self.system.add_scaled(theta * time_step_s, &self.laplace_new);
    }

    /// Constrain a node of the combined system to a fixed value.
    pub fn apply_dirichlet(&mut self, node: usize, value: f64) {
        self.system.apply_dirichlet(&mut self.rhs, node, value);
    }

    /// Conjugate-gradient solve of the combined system to a relative
    /// residual tolerance, writing the result into `solution` (also the
    /// initial guess). Returns the iteration count.
    pub fn solve(
        &mut self,
        solution: &mut [f64],
        relative_tolerance: f64,
    ) -> Result<usize, SimulationError> {
        let n = self.n_dofs();
        let rhs_norm = l2_norm(&self.rhs);
        if rhs_norm == 0.0 {
            solution.fill(0.0);
            return Ok(0);
        }
        let tolerance = relative_tolerance * rhs_norm;
        let max_iterations = 2 * n;

        self.system.vmult(solution, &mut self.cg_ap);
        for i in 0..n {
            self.cg_r[i] = self.rhs[i] - self.cg_ap[i];
            self.cg_p[i] = self.cg_r[i];
        }
        let mut rs_old = dot(&self.cg_r, &self.cg_r);

        for iteration in 0..max_iterations {
            if rs_old.sqrt() <= tolerance {
                return Ok(iteration);
            }
            self.system.vmult(&self.cg_p, &mut self.cg_ap);
            let p_ap = dot(&self.cg_p, &self.cg_ap);
            if p_ap <= 0.0 {
                return Err(SimulationError::LinearSolveFailed {
                    iterations: iteration,
                    residual: rs_old.sqrt(),
                });
            }
            let alpha = rs_old / p_ap;
            for i in 0..n {
                solution[i] += alpha * self.cg_p[i];
                self.cg_r[i] -= alpha * self.cg_ap[i];
            }
            let rs_new = dot(&self.cg_r, &self.cg_r);
            let beta = rs_new / rs_old;
            for i in 0..n {
                self.cg_p[i] = self.cg_r[i] + beta * self.cg_p[i];
            }
            rs_old = rs_new;
        }

        if rs_old.sqrt() <= tolerance {
            Ok(max_iterations)
        } else {
            Err(SimulationError::LinearSolveFailed {
                iterations: max_iterations,
                residual: rs_old.sqrt(),
            })
        }
    }

    /// Evaluate a nodal field at an arbitrary coordinate inside the domain.
    pub fn point_value(&self, field: &[f64], x: f64) -> Result<f64, SimulationError> {
        let e = self.mesh.containing_cell(x)?;
        let local = (x - self.mesh.node_x(e)) / self.mesh.cell_size_m();
        Ok((1.0 - local) * field[e] + local * field[e + 1])
    }

    /// Project an initial-condition function onto the discretization by
    /// nodal interpolation (exact for linear elements).
    pub fn project<F>(&self, f: F) -> Result<Vec<f64>, SimulationError>
    where
        F: Fn(f64) -> Result<f64, SimulationError>,
    {
        (0..self.n_dofs()).map(|i| f(self.mesh.node_x(i))).collect()
    }
}
