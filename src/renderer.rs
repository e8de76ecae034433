use std::path::Path;
use std::time::Instant;

use image::{ImageBuffer, Luma, Rgb};
use log::info;
use nalgebra as na;
use na::vector;
use thiserror::Error;

use crate::camera::Camera;
use crate::color::{Color, UnsignedColor};
use crate::model::{Model, ModelError, Vertex};
use crate::rasterizer::{Rasterizer, RasterizerError, DEFAULT_DEPTH};
use crate::resource::Resource;

/// Everything one offline frame needs, assembled by the caller (command line
/// flags here); the pipeline itself reads no files and no environment.
pub struct Settings {
    pub width: usize,
    pub height: usize,
    pub model_path: String,
    pub camera_position: [f32; 3],
    pub camera_theta: f32,         // Yaw in degrees.
    pub camera_phi: f32,           // Pitch in degrees.
    pub camera_angle_of_view: f32, // Vertical field of view in degrees.
    pub camera_z_near: f32,
    pub camera_z_far: f32,
    pub clear_color: [u8; 3],
    pub result_path: String,
    pub depth_path: Option<String>, // Optional depth buffer visualization.
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Rasterizer(#[from] RasterizerError),
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders one frame: loads the model, builds the camera, wires the shading
/// stages from the combined transform, draws every sub-mesh and writes the
/// result image.
pub fn render(settings: &Settings) -> Result<(), RenderError> {
    let model = Model::load_obj(Path::new(&settings.model_path))?;
    info!(
        "loaded {} with {} sub-meshes",
        settings.model_path,
        model.get_index_buffers().len()
    );

    let mut camera = Camera::new();
    camera.set_width(settings.width as f32);
    camera.set_height(settings.height as f32);
    camera.set_position(vector![
        settings.camera_position[0],
        settings.camera_position[1],
        settings.camera_position[2]
    ]);
    camera.set_theta(settings.camera_theta);
    camera.set_phi(settings.camera_phi);
    camera.set_angle_of_view(settings.camera_angle_of_view);
    camera.set_z_near(settings.camera_z_near);
    camera.set_z_far(settings.camera_z_far);

    let mut render_target: Resource<UnsignedColor> =
        Resource::with_size(settings.width, settings.height);
    let mut depth_buffer: Resource<f32> = Resource::with_size(settings.width, settings.height);

    // Composed right to left: world, then view, then projection.
    let matrix = camera.get_projection_matrix() * camera.get_view_matrix() * model.get_world_matrix();

    let start = Instant::now();
    {
        let mut rasterizer: Rasterizer<Vertex, UnsignedColor> = Rasterizer::new();
        rasterizer.set_viewport(settings.width, settings.height);
        rasterizer.set_render_target(&mut render_target, Some(&mut depth_buffer));
        rasterizer.set_vertex_function(Box::new(move |position, data| {
            return (matrix * position, data);
        }));
        rasterizer.set_pixel_function(Box::new(|_, _| Color::new(1.0, 1.0, 1.0)));
        rasterizer.clear_render_target(
            UnsignedColor {
                r: settings.clear_color[0],
                g: settings.clear_color[1],
                b: settings.clear_color[2],
            },
            DEFAULT_DEPTH,
        );

        for shape in 0..model.get_index_buffers().len() {
            let index_buffer = &model.get_index_buffers()[shape];
            rasterizer.set_vertex_buffer(&model.get_vertex_buffers()[shape]);
            rasterizer.set_index_buffer(index_buffer);
            rasterizer.draw(index_buffer.count(), 0)?;
        }
    }
    info!("rendered in {:.3} s", start.elapsed().as_secs_f32());

    save_color_image(&render_target, &settings.result_path)?;
    info!("wrote {}", settings.result_path);
    if let Some(depth_path) = &settings.depth_path {
        save_depth_image(&depth_buffer, depth_path)?;
        info!("wrote {}", depth_path);
    }
    return Ok(());
}

fn save_color_image(
    render_target: &Resource<UnsignedColor>,
    path: &str,
) -> Result<(), image::ImageError> {
    let mut image = ImageBuffer::new(render_target.width() as u32, render_target.height() as u32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let color = render_target.item_at(x as usize, y as usize);
        *pixel = Rgb([color.r, color.g, color.b]);
    }
    return image.save(path);
}

/// Writes the depth buffer as a min-max normalized grayscale image; pixels
/// still at the clear sentinel come out white.
fn save_depth_image(depth_buffer: &Resource<f32>, path: &str) -> Result<(), image::ImageError> {
    let mut z_min = f32::MAX;
    let mut z_max = f32::MIN;
    for &z in depth_buffer.data() {
        if z < DEFAULT_DEPTH {
            z_min = z_min.min(z);
            z_max = z_max.max(z);
        }
    }
    let scale = if z_max > z_min { z_max - z_min } else { 1.0 };

    let mut image = ImageBuffer::new(depth_buffer.width() as u32, depth_buffer.height() as u32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let z = *depth_buffer.item_at(x as usize, y as usize);
        let value = if z < DEFAULT_DEPTH {
            (255.0 * (z - z_min) / scale).round() as u8
        } else {
            255
        };
        *pixel = Luma([value]);
    }
    return image.save(path);
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn renders_a_triangle_to_an_image_file() {
        let directory = std::env::temp_dir();
        let model_path = directory.join("tiny_rasterizer_triangle.obj");
        let result_path = directory.join("tiny_rasterizer_triangle.png");
        let depth_path = directory.join("tiny_rasterizer_triangle_depth.png");
        fs::write(
            &model_path,
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n",
        )
        .unwrap();

        let settings = Settings {
            width: 64,
            height: 64,
            model_path: model_path.to_string_lossy().into_owned(),
            camera_position: [0.0, 0.0, 3.0],
            camera_theta: 0.0,
            camera_phi: 0.0,
            camera_angle_of_view: 60.0,
            camera_z_near: 0.1,
            camera_z_far: 100.0,
            clear_color: [0, 0, 0],
            result_path: result_path.to_string_lossy().into_owned(),
            depth_path: Some(depth_path.to_string_lossy().into_owned()),
        };
        render(&settings).unwrap();

        let image = image::open(&result_path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (64, 64));
        // The triangle projects near the screen center; the corners stay at
        // the clear color.
        let center_white = (24u32..40)
            .flat_map(|x| (24u32..40).map(move |y| (x, y)))
            .any(|(x, y)| image.get_pixel(x, y).0 == [255, 255, 255]);
        assert!(center_white);
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(62, 62).0, [0, 0, 0]);

        let depth_image = image::open(&depth_path).unwrap().to_luma8();
        // Background is white, covered pixels are darker.
        assert_eq!(depth_image.get_pixel(1, 1).0, [255]);
        assert!(depth_image.pixels().any(|pixel| pixel.0[0] < 255));
    }
}
