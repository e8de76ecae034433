mod camera;
mod color;
mod model;
mod rasterizer;
mod renderer;
mod resource;

use std::env;

use crate::renderer::Settings;

const WIDTH: usize = 800;
const HEIGHT: usize = 800;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Default values.
    let mut settings = Settings {
        width: WIDTH,
        height: HEIGHT,
        model_path: String::from("assets/model.obj"),
        camera_position: [0.0, 1.0, 5.0],
        camera_theta: 0.0,
        camera_phi: 0.0,
        camera_angle_of_view: 60.0,
        camera_z_near: 0.001,
        camera_z_far: 100.0,
        clear_color: [0, 0, 0],
        result_path: String::from("result.png"),
        depth_path: None,
    };

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i + 1 < args.len() {
        match args[i].as_str() {
            "-p" => settings.model_path = args[i + 1].clone(),
            "-o" => settings.result_path = args[i + 1].clone(),
            "-w" => settings.width = args[i + 1].parse()?,
            "-h" => settings.height = args[i + 1].parse()?,
            "--camera" => {
                let mut components = args[i + 1].split(',');
                for value in settings.camera_position.iter_mut() {
                    if let Some(component) = components.next() {
                        *value = component.parse()?;
                    }
                }
            }
            "--theta" => settings.camera_theta = args[i + 1].parse()?,
            "--phi" => settings.camera_phi = args[i + 1].parse()?,
            "--fov" => settings.camera_angle_of_view = args[i + 1].parse()?,
            "--near" => settings.camera_z_near = args[i + 1].parse()?,
            "--far" => settings.camera_z_far = args[i + 1].parse()?,
            "--clear" => {
                let mut channels = args[i + 1].split(',');
                for value in settings.clear_color.iter_mut() {
                    if let Some(channel) = channels.next() {
                        *value = channel.parse()?;
                    }
                }
            }
            "--depth" => settings.depth_path = Some(args[i + 1].clone()),
            _ => (),
        }
        i += 1;
    }

    renderer::render(&settings)?;

    return Ok(());
}
