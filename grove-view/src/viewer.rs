//! Interactive 3D family-tree viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns the engine state
//! ([`Grove`]), an orbit camera and the UI selection, and implements
//! [`eframe::App`] to draw the tube mesh and inspect people.

use eframe::App;
use egui::{Color32, Pos2, Rect, ecolor::Hsva, epaint};
use glam::{Mat4, Vec2, Vec3};
use grove_core::{
    Config, Grove, PersonInfo,
    mesh::{Mesh, Vertex},
    picking::Ray,
    scene::Snapshot,
    types::PersonId,
};
use std::{f32::consts::FRAC_PI_2, path::PathBuf, sync::Arc};

/// Family shown when no file is given on the command line.
pub const SAMPLE_FAMILY: &str = include_str!("../assets/sample_family.json");

const FOV_Y: f32 = 0.9;
const NEAR: f32 = 0.05;
const FAR: f32 = 1_000.0;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 500.0;

/// Share of the light that reaches faces turned away from the eye.
const AMBIENT: f32 = 0.3;
/// How much a vertex's glow adds to its brightness.
const GLOW_GAIN: f32 = 0.35;
/// Extra glow on hovered and selected people.
const HIGHLIGHT_GLOW: f32 = 0.5;

/// How a family file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyFormat {
    Json,
    Yaml,
}

/// Where the family document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Bundled,
    File(PathBuf),
}

impl Source {
    fn read(&self) -> Result<String, String> {
        match self {
            Source::Bundled => Ok(SAMPLE_FAMILY.to_string()),
            Source::File(path) => std::fs::read_to_string(path)
                .map_err(|err| format!("cannot read {}: {err}", path.display())),
        }
    }

    /// `.yaml` and `.yml` files are YAML; everything else is JSON.
    fn format(&self) -> FamilyFormat {
        let Source::File(path) = self else {
            return FamilyFormat::Json;
        };
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                FamilyFormat::Yaml
            }
            _ => FamilyFormat::Json,
        }
    }

    fn label(&self) -> String {
        match self {
            Source::Bundled => "sample family".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

/// Orbit camera looking at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 4.0, 0.0),
            yaw: 0.6,
            pitch: 0.25,
            distance: 16.0,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(cp * sy, sp, cp * cy) * self.distance
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y, aspect.max(1e-3), NEAR, FAR)
    }

    pub fn view_projection(&self, rect: egui::Rect) -> Mat4 {
        self.projection(rect.width() / rect.height().max(1.0)) * self.view()
    }

    /// Rotates around the target; pitch stays short of the poles.
    pub fn orbit(&mut self, delta: egui::Vec2) {
        self.yaw -= delta.x * 0.01;
        self.pitch = (self.pitch + delta.y * 0.01).clamp(-FRAC_PI_2 + 0.05, FRAC_PI_2 - 0.05);
    }

    /// Moves the target in the view plane by a screen-space delta.
    pub fn pan(&mut self, delta: egui::Vec2, rect: egui::Rect) {
        let view = self.view();
        let right = view.row(0).truncate();
        let up = view.row(1).truncate();
        let units_per_px = 2.0 * self.distance * (FOV_Y * 0.5).tan() / rect.height().max(1.0);
        self.target += (-right * delta.x + up * delta.y) * units_per_px;
    }

    pub fn zoom(&mut self, scroll: f32) {
        let factor = (1.0 - scroll * 0.001).clamp(0.5, 2.0);
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Frames a bounding sphere.
    pub fn fit(&mut self, center: Vec3, radius: f32) {
        self.target = center;
        self.distance = (radius.max(0.5) / (FOV_Y * 0.5).sin()).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

/// Converts a world-space position to screen-space.
///
/// Returns the screen position and the clip-space depth `w`, or `None`
/// for points behind the camera.
pub fn world_to_screen(view_proj: &Mat4, p: Vec3, rect: Rect) -> Option<(Pos2, f32)> {
    let clip = *view_proj * p.extend(1.0);
    if clip.w <= NEAR * 0.5 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    let center = rect.center();
    Some((
        egui::pos2(
            center.x + ndc.x * rect.width() * 0.5,
            center.y - ndc.y * rect.height() * 0.5,
        ),
        clip.w,
    ))
}

/// Converts a screen-space position to normalized device coordinates.
pub fn screen_to_ndc(p: egui::Pos2, rect: egui::Rect) -> Vec2 {
    let center = rect.center();
    Vec2::new(
        (p.x - center.x) / (rect.width() * 0.5),
        (center.y - p.y) / (rect.height() * 0.5),
    )
}

/// Color of one mesh vertex lit by a light at the eye.
///
/// Lambert shading plus an ambient floor, lifted by the vertex glow.
/// Luminance sets the base value, vibrancy the saturation and the hue
/// comes straight from the vertex.
pub fn shade_vertex(v: &Vertex, eye: Vec3, highlighted: bool) -> Color32 {
    let to_eye = (eye - v.position()).normalize_or_zero();
    let lit = AMBIENT + (1.0 - AMBIENT) * v.normal().dot(to_eye).max(0.0);
    let glow = if highlighted { v.glow + HIGHLIGHT_GLOW } else { v.glow };
    let value = ((0.35 + 0.65 * v.luminance) * lit + GLOW_GAIN * glow).min(1.0);
    let mut saturation = 0.25 + 0.65 * v.vibrancy;
    if highlighted {
        saturation *= 0.5;
    }
    Color32::from(Hsva::new((v.hue / 360.0).rem_euclid(1.0), saturation, value, 1.0))
}

/// Projects a tube mesh into a flat, painter-ready mesh.
///
/// Triangles facing away from the eye or reaching behind it are dropped;
/// the rest are ordered far to near so nearer surfaces paint over.
///
/// ### Parameters
/// - `mesh` - World-space tube mesh.
/// - `view_proj` - Camera view-projection matrix.
/// - `eye` - Camera position, used for culling and lighting.
/// - `rect` - Screen area the view fills.
/// - `highlighted` - Per [`Mesh::owners`] entry, whether to brighten it.
///
/// ### Returns
/// An [`epaint::Mesh`] with three vertices per visible triangle.
pub fn project_mesh(
    mesh: &Mesh,
    view_proj: &Mat4,
    eye: Vec3,
    rect: Rect,
    highlighted: &[bool],
) -> epaint::Mesh {
    let shaded: Vec<Option<(Pos2, f32, Color32)>> = mesh
        .vertices
        .iter()
        .map(|v| {
            let (pos, w) = world_to_screen(view_proj, v.position(), rect)?;
            let lit = highlighted.get(v.owner as usize).copied().unwrap_or(false);
            Some((pos, w, shade_vertex(v, eye, lit)))
        })
        .collect();

    let mut visible: Vec<(f32, [(Pos2, Color32); 3])> = mesh
        .triangles()
        .filter_map(|[a, b, c]| {
            let [pa, pb, pc] = [a, b, c].map(|i| mesh.vertices[i as usize].position());
            if (pb - pa).cross(pc - pa).dot(eye - pa) <= 0.0 {
                return None;
            }
            let (qa, qb, qc) = (shaded[a as usize]?, shaded[b as usize]?, shaded[c as usize]?);
            let depth = qa.1 + qb.1 + qc.1;
            Some((depth, [(qa.0, qa.2), (qb.0, qb.2), (qc.0, qc.2)]))
        })
        .collect();
    visible.sort_by(|x, y| y.0.total_cmp(&x.0));

    let mut out = epaint::Mesh::default();
    out.reserve_triangles(visible.len());
    out.reserve_vertices(visible.len() * 3);
    for (_, corners) in visible {
        let base = out.vertices.len() as u32;
        for (pos, color) in corners {
            out.colored_vertex(pos, color);
        }
        out.add_triangle(base, base + 1, base + 2);
    }
    out
}

/// Main application state for the interactive viewer.
///
/// [`Viewer`] glues together:
/// - The engine: [`Grove`] and the editable [`Config`].
/// - UI state: orbit camera, hovered and selected people, last error.
/// - eframe/egui callbacks for drawing and user interaction.
pub struct Viewer {
    grove: Grove,
    cfg: Config,
    source: Source,

    camera: OrbitCamera,
    hovered: Option<PersonId>,
    selected: Option<PersonId>,
    error: Option<String>,
}

impl Viewer {
    /// Creates a viewer and loads the family from `source`.
    ///
    /// A failed first load leaves the scene empty and shows the error.
    ///
    /// ### Parameters
    /// - `source` - Bundled sample or a JSON/YAML family file.
    /// - `cfg` - Starting configuration, editable in the config panel.
    ///
    /// ### Returns
    /// A viewer with the camera fitted to the loaded tree.
    pub fn new(source: Source, cfg: Config) -> Self {
        let mut viewer = Self {
            grove: Grove::new(cfg),
            cfg,
            source,
            camera: OrbitCamera::default(),
            hovered: None,
            selected: None,
            error: None,
        };
        viewer.reload();
        viewer.fit_view();
        viewer
    }

    /// Re-reads the source. Failures keep the current tree.
    fn reload(&mut self) {
        let format = self.source.format();
        let result = self.source.read().and_then(|text| {
            let loaded = match format {
                FamilyFormat::Json => self.grove.load_json(&text),
                FamilyFormat::Yaml => self.grove.load_yaml(&text),
            };
            loaded.map_err(|err| err.to_string())
        });

        match result {
            Ok(snapshot) => {
                self.error = None;
                self.forget_missing(&snapshot);
            }
            Err(err) => {
                log::warn!("reload of {} failed: {err}", self.source.label());
                self.error = Some(err);
            }
        }
    }

    /// Regrows the current family with the edited config.
    fn regenerate(&mut self) {
        if let Some(snapshot) = self.grove.set_config(self.cfg) {
            self.forget_missing(&snapshot);
        }
    }

    /// Drops a selection that no longer exists in `snapshot`.
    fn forget_missing(&mut self, snapshot: &Snapshot) {
        let exists = |id: &Option<PersonId>| {
            id.as_deref()
                .is_some_and(|id| snapshot.skeleton().find_person(id).is_some())
        };
        if !exists(&self.selected) {
            self.selected = None;
        }
        if !exists(&self.hovered) {
            self.hovered = None;
        }
    }

    fn fit_view(&mut self) {
        if let Some(snapshot) = self.grove.snapshot() {
            let bounds = snapshot.mesh().bounds;
            self.camera.fit(bounds.center, bounds.radius);
        }
    }

    /// Person under a screen position.
    fn pick_at(&self, snapshot: &Snapshot, p: Pos2, rect: Rect) -> Option<PersonId> {
        let inv = self.camera.view_projection(rect).inverse();
        let ray = Ray::from_ndc(screen_to_ndc(p, rect), &inv)?;
        snapshot.pick_ray(&ray).map(str::to_string)
    }

    /// Helper to draw a labeled `f32` [`egui::DragValue`].
    fn labeled_drag_f32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f32,
        range: std::ops::RangeInclusive<f32>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Helper to draw a labeled `u32` [`egui::DragValue`].
    fn labeled_drag_u32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut u32,
        range: std::ops::RangeInclusive<u32>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Builds the top panel UI (reload, fit, current source).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("⟳ Reload").clicked() {
                    self.reload();
                }
                if ui.button("Fit view").clicked() {
                    self.fit_view();
                }
                ui.separator();
                ui.label(self.source.label());
                if let Some(err) = &self.error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });
        });
    }

    /// Builds the bottom status bar (people, segments, mesh size).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let Some(snapshot) = self.grove.snapshot() else {
                    ui.label("no family loaded");
                    return;
                };
                let mesh = snapshot.mesh();
                ui.label(format!("triangles = {}", mesh.triangle_count()));
                ui.label(format!("vertices = {}", mesh.vertex_count()));
                ui.separator();
                ui.label(format!("joints = {}", snapshot.skeleton().joints.len()));
                ui.label(format!("segments = {}", snapshot.skeleton().len()));
                ui.label(format!("people = {}", snapshot.genealogy().len()));
                if let Some(id) = &self.hovered {
                    ui.separator();
                    ui.label(format!("hover: {id}"));
                }
            });
        });
    }

    /// Builds the left-hand panel with the selected person's record.
    fn ui_info_panel(&mut self, ctx: &egui::Context) {
        let info: Option<PersonInfo> = self.selected.as_deref().and_then(|id| self.grove.info(id));
        egui::SidePanel::left("info_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Person");
                ui.separator();
                let Some(info) = info else {
                    ui.label("Click a branch to see who it belongs to.");
                    return;
                };
                ui.label(egui::RichText::new(&info.name).strong().size(18.0));
                let lifespan = info.lifespan.to_string();
                if !lifespan.is_empty() {
                    ui.label(lifespan);
                }
                ui.small(&info.id);
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if info.biography.trim().is_empty() {
                        ui.weak("No biography.");
                    } else {
                        ui.label(&info.biography);
                    }
                });
                if ui.button("Clear selection").clicked() {
                    self.selected = None;
                }
            });
    }

    /// Growth, tropism and prominence settings.
    fn ui_growth_controls(ui: &mut egui::Ui, cfg: &mut Config) {
        let g = &mut cfg.growth;
        ui.separator();
        ui.label("Growth");
        ui.horizontal(|ui| {
            ui.label("seed:");
            ui.add(egui::DragValue::new(&mut g.seed));
        });
        Self::labeled_drag_f32(ui, "base_length:", &mut g.base_length, 0.1..=100.0, 0.05);
        Self::labeled_drag_f32(ui, "length_decay:", &mut g.length_decay, 0.3..=1.0, 0.01);
        Self::labeled_drag_f32(ui, "base_radius:", &mut g.base_radius, 0.01..=10.0, 0.01);
        Self::labeled_drag_f32(ui, "radius_decay:", &mut g.radius_decay, 0.3..=1.0, 0.01);
        Self::labeled_drag_f32(ui, "tip_taper:", &mut g.tip_taper, 0.1..=1.0, 0.01);
        Self::labeled_drag_f32(ui, "perturbation:", &mut g.perturbation, 0.0..=0.5, 0.01);
        Self::labeled_drag_f32(ui, "branch_spread:", &mut g.branch_spread, 0.05..=1.35, 0.01);
        Self::labeled_drag_f32(ui, "fan_spread:", &mut g.fan_spread, 0.1..=2.7, 0.01);
        Self::labeled_drag_f32(ui, "max_turn:", &mut g.max_turn, 0.2..=1.5, 0.01);

        ui.separator();
        ui.label("Tropism");
        Self::labeled_drag_f32(ui, "tropism.x:", &mut g.tropism.x, -1.0..=1.0, 0.01);
        Self::labeled_drag_f32(ui, "tropism.y:", &mut g.tropism.y, -1.0..=1.0, 0.01);
        Self::labeled_drag_f32(ui, "tropism.z:", &mut g.tropism.z, -1.0..=1.0, 0.01);

        let p = &mut cfg.prominence;
        ui.separator();
        ui.label("Prominence");
        Self::labeled_drag_f32(
            ui,
            "saturation_length:",
            &mut p.saturation_length,
            1.0..=100_000.0,
            5.0,
        );
        Self::labeled_drag_f32(ui, "thickness_floor:", &mut p.thickness_floor, 0.01..=1.0, 0.01);
        Self::labeled_drag_f32(ui, "glow_floor:", &mut p.glow_floor, 0.01..=1.0, 0.01);
    }

    /// Tessellation settings.
    fn ui_mesh_controls(ui: &mut egui::Ui, cfg: &mut Config) {
        let m = &mut cfg.mesh;
        ui.separator();
        ui.label("Mesh");
        Self::labeled_drag_u32(ui, "radial_segments:", &mut m.radial_segments, 3..=64, 1.0);
        Self::labeled_drag_f32(ui, "ring_spacing:", &mut m.ring_spacing, 0.02..=10.0, 0.01);
        Self::labeled_drag_f32(
            ui,
            "bark_displacement:",
            &mut m.bark_displacement,
            0.0..=0.3,
            0.005,
        );
        Self::labeled_drag_u32(ui, "joint_rings:", &mut m.joint_rings, 1..=8, 1.0);
        Self::labeled_drag_f32(ui, "joint_offset:", &mut m.joint_offset, 0.0..=2.0, 0.01);
    }

    /// Builds the right-hand configuration panel for growth parameters.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Config");
                egui::ScrollArea::vertical().show(ui, |ui| {
                    Self::ui_growth_controls(ui, &mut self.cfg);
                    Self::ui_mesh_controls(ui, &mut self.cfg);

                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.button("Regenerate").clicked() {
                            self.regenerate();
                        }
                        if ui.button("Reset cfg to default").clicked() {
                            self.cfg = Config::default();
                        }
                    });
                });
            });
    }

    /// Builds the central panel where the tree is drawn and picked.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(8, 10, 18));

            // Orbit with the primary button, pan with the secondary one.
            if response.dragged_by(egui::PointerButton::Primary) {
                self.camera.orbit(response.drag_delta());
            }
            if response.dragged_by(egui::PointerButton::Secondary) {
                self.camera.pan(response.drag_delta(), rect);
            }
            if response.hovered() {
                let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    self.camera.zoom(scroll);
                }
            }

            let Some(snapshot) = self.grove.snapshot() else {
                return;
            };

            self.hovered = response
                .hover_pos()
                .and_then(|p| self.pick_at(&snapshot, p, rect));
            if response.clicked() {
                self.selected = self.hovered.clone();
            }

            self.draw_mesh(&painter, rect, &snapshot);
        });
    }

    /// Draws the shaded tube mesh, brightening hovered and selected people.
    fn draw_mesh(&self, painter: &egui::Painter, rect: Rect, snapshot: &Arc<Snapshot>) {
        let mesh = snapshot.mesh();
        let highlighted: Vec<bool> = mesh
            .owners
            .iter()
            .map(|id| {
                [&self.hovered, &self.selected]
                    .into_iter()
                    .any(|h| h.as_deref() == Some(id.as_str()))
            })
            .collect();
        let view_proj = self.camera.view_projection(rect);
        let flat = project_mesh(mesh, &view_proj, self.camera.eye(), rect, &highlighted);
        if !flat.is_empty() {
            painter.add(egui::Shape::mesh(flat));
        }
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_info_panel(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}
