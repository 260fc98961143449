use glam::UVec2;

use crate::Bindable;

#[derive(Debug)]
pub struct Texture {
    tex: wgpu::Texture,
    view: wgpu::TextureView,
    level_views: Vec<wgpu::TextureView>,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
    dimension: wgpu::TextureViewDimension,
    filtering: bool,
}

impl Texture {
    pub fn builder(label: impl ToString) -> TextureBuilder {
        TextureBuilder::new(label)
    }

    pub fn tex(&self) -> &wgpu::Texture {
        &self.tex
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn mips(&self) -> u32 {
        self.level_views.len() as u32
    }

    /// Binds mip 0 as a read-write storage texture.
    pub fn bind_storage(&self) -> impl Bindable + '_ {
        self.bind_level(0)
    }

    /// Binds given mip as a read-write storage texture.
    pub fn bind_level(&self, level: u32) -> impl Bindable + '_ {
        assert!(
            level < self.mips(),
            "mip level out of range: {} >= {}",
            level,
            self.mips()
        );

        StorageTextureBinder {
            parent: self,
            level,
        }
    }

    /// Binds the whole texture (all mips and layers) together with its
    /// sampler; occupies two consecutive bindings.
    pub fn bind_sampled(&self) -> impl Bindable + '_ {
        SampledTextureBinder { parent: self }
    }
}

#[derive(Debug)]
pub struct TextureBuilder {
    label: String,
    size: UVec2,
    layers: u32,
    depth: u32,
    mips: u32,
    format: Option<wgpu::TextureFormat>,
    usage: wgpu::TextureUsages,
    filtering: bool,
}

impl TextureBuilder {
    pub fn new(label: impl ToString) -> Self {
        Self {
            label: format!("lightcache_{}", label.to_string()),
            size: Default::default(),
            layers: 1,
            depth: 1,
            mips: 1,
            format: None,
            usage: wgpu::TextureUsages::empty(),
            filtering: false,
        }
    }

    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size;
        self
    }

    /// Turns the texture into a 2D array.
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    /// Turns the texture into a 3D one.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_mips(mut self, mips: u32) -> Self {
        self.mips = mips;
        self
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_usage(mut self, usage: wgpu::TextureUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn with_filtering(mut self) -> Self {
        self.filtering = true;
        self
    }

    pub fn build(self, device: &wgpu::Device) -> Texture {
        let label = self.label;

        assert!(self.size.x > 0 && self.size.y > 0);
        assert!(self.layers == 1 || self.depth == 1);
        assert!(self.mips > 0);

        let format = self.format.unwrap_or(wgpu::TextureFormat::Rgba16Float);

        let (dimension, view_dimension, depth_or_array_layers) =
            if self.depth > 1 {
                (
                    wgpu::TextureDimension::D3,
                    wgpu::TextureViewDimension::D3,
                    self.depth,
                )
            } else if self.layers > 1 {
                (
                    wgpu::TextureDimension::D2,
                    wgpu::TextureViewDimension::D2Array,
                    self.layers,
                )
            } else {
                (
                    wgpu::TextureDimension::D2,
                    wgpu::TextureViewDimension::D2,
                    1,
                )
            };

        log::info!(
            "Allocating texture `{label}`; size={:?}, layers={}, depth={}, \
             mips={}, format={format:?}",
            self.size,
            self.layers,
            self.depth,
            self.mips,
        );

        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: self.size.x,
                height: self.size.y,
                depth_or_array_layers,
            },
            mip_level_count: self.mips,
            sample_count: 1,
            dimension,
            format,
            usage: self.usage,
            view_formats: &[],
        });

        let view = tex.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}_view")),
            dimension: Some(view_dimension),
            ..Default::default()
        });

        let level_views = (0..self.mips)
            .map(|level| {
                tex.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}_view_{level}")),
                    dimension: Some(view_dimension),
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let filter = if self.filtering {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label}_sampler")),
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: filter,
            ..Default::default()
        });

        Texture {
            tex,
            view,
            level_views,
            sampler,
            format,
            dimension: view_dimension,
            filtering: self.filtering,
        }
    }
}

pub struct StorageTextureBinder<'a> {
    parent: &'a Texture,
    level: u32,
}

impl Bindable for StorageTextureBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::ReadWrite,
                format: self.parent.format,
                view_dimension: self.parent.dimension,
            },
            count: None,
        };

        let resource = wgpu::BindingResource::TextureView(
            &self.parent.level_views[self.level as usize],
        );

        vec![(layout, resource)]
    }
}

pub struct SampledTextureBinder<'a> {
    parent: &'a Texture,
}

impl Bindable for SampledTextureBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let tex_layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: self.parent.dimension,
                sample_type: wgpu::TextureSampleType::Float {
                    filterable: self.parent.filtering,
                },
            },
            count: None,
        };

        let sampler_type = if self.parent.filtering {
            wgpu::SamplerBindingType::Filtering
        } else {
            wgpu::SamplerBindingType::NonFiltering
        };

        let sampler_layout = wgpu::BindGroupLayoutEntry {
            binding: binding + 1,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Sampler(sampler_type),
            count: None,
        };

        vec![
            (
                tex_layout,
                wgpu::BindingResource::TextureView(&self.parent.view),
            ),
            (
                sampler_layout,
                wgpu::BindingResource::Sampler(&self.parent.sampler),
            ),
        ]
    }
}
