// ============================================================
// Layer 5: DenseNet Architecture
// ============================================================
// Huang et al. (2017), "Densely Connected Convolutional Networks",
// in the compact form used for the 17-category flower set:
//
//   stem        Conv 7×7/2 (3→64) → BN → ReLU → MaxPool 3×3/2
//   block 1     4 × ConvBlock, growth 32          64 → 192
//   transition  BN → ReLU → Conv 1×1 → AvgPool 2×2  192 →  96
//   block 2                                        96 → 224
//   transition                                    224 → 112
//   block 3                                       112 → 240
//   transition                                    240 → 120
//   block 4                                       120 → 248
//   head        BN → ReLU → global AvgPool → Linear(248 → classes)
//
// Each ConvBlock concatenates its output onto its input along the
// channel axis, so channel count grows by `growth_rate` per block
// and every later block sees all earlier feature maps.
//
// Initialisation: conv weights Kaiming-normal (fan-in, gain √2),
// batch-norm γ = 1 / β = 0 (Burn's defaults), linear bias 0.

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{
            AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig,
            AvgPool2d, AvgPool2dConfig,
            MaxPool2d, MaxPool2dConfig,
        },
        BatchNorm, BatchNormConfig,
        Initializer,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

fn conv_initializer() -> Initializer {
    Initializer::KaimingNormal { gain: std::f64::consts::SQRT_2, fan_out_only: false }
}

// ─── ConvBlock ────────────────────────────────────────────────────────────────
/// BN → ReLU → Conv 3×3, output concatenated onto the input.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub norm: BatchNorm<B, 2>,
    pub conv: Conv2d<B>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(input_channels: usize, num_channels: usize, device: &B::Device) -> Self {
        let norm = BatchNormConfig::new(input_channels).init(device);
        let conv = Conv2dConfig::new([input_channels, num_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_initializer(conv_initializer())
            .init(device);
        Self { norm, conv }
    }

    /// [N, C, H, W] → [N, C + num_channels, H, W]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let y = self.conv.forward(relu(self.norm.forward(x.clone())));
        Tensor::cat(vec![x, y], 1)
    }
}

// ─── DenseBlock ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub convs: Vec<ConvBlock<B>>,
}

impl<B: Backend> DenseBlock<B> {
    pub fn new(
        num_convs:      usize,
        input_channels: usize,
        num_channels:   usize,
        device:         &B::Device,
    ) -> Self {
        let convs = (0..num_convs)
            .map(|i| ConvBlock::new(input_channels + i * num_channels, num_channels, device))
            .collect();
        Self { convs }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.convs.iter().fold(x, |x, block| block.forward(x))
    }
}

// ─── TransitionBlock ──────────────────────────────────────────────────────────
/// BN → ReLU → Conv 1×1 → AvgPool 2×2/2. Halves height and width.
#[derive(Module, Debug)]
pub struct TransitionBlock<B: Backend> {
    pub norm: BatchNorm<B, 2>,
    pub conv: Conv2d<B>,
    pub pool: AvgPool2d,
}

impl<B: Backend> TransitionBlock<B> {
    pub fn new(input_channels: usize, num_channels: usize, device: &B::Device) -> Self {
        let norm = BatchNormConfig::new(input_channels).init(device);
        let conv = Conv2dConfig::new([input_channels, num_channels], [1, 1])
            .with_initializer(conv_initializer())
            .init(device);
        let pool = AvgPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        Self { norm, conv, pool }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.conv.forward(relu(self.norm.forward(x))))
    }
}

// ─── DenseNet ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DenseNetConfig {
    pub num_classes: usize,
    #[config(default = 3)]
    pub input_channels: usize,
    /// Channels produced by the stem convolution
    #[config(default = 64)]
    pub initial_channels: usize,
    /// Channels added by every ConvBlock
    #[config(default = 32)]
    pub growth_rate: usize,
    /// Number of ConvBlocks in each dense block
    #[config(default = "vec![4, 4, 4, 4]")]
    pub block_sizes: Vec<usize>,
}

impl DenseNetConfig {
    /// Channel count after the stem, then after every dense block and
    /// every transition, in forward order.
    pub fn feature_channels(&self) -> Vec<usize> {
        let mut channels = self.initial_channels;
        let mut out = vec![channels];
        for (i, &num_convs) in self.block_sizes.iter().enumerate() {
            channels += num_convs * self.growth_rate;
            out.push(channels);
            if i + 1 != self.block_sizes.len() {
                channels /= 2;
                out.push(channels);
            }
        }
        out
    }

    /// Smallest square input the pooling stages accept: the stem
    /// divides by 4 and every transition halves again.
    pub fn min_input_size(&self) -> usize {
        4 << self.block_sizes.len().saturating_sub(1)
    }

    /// Channels entering the classifier
    pub fn output_channels(&self) -> usize {
        self.feature_channels().last().copied().unwrap_or(self.initial_channels)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseNet<B> {
        let stem_conv = Conv2dConfig::new([self.input_channels, self.initial_channels], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_initializer(conv_initializer())
            .init(device);
        let stem_norm = BatchNormConfig::new(self.initial_channels).init(device);
        let stem_pool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut num_channels = self.initial_channels;
        let mut blocks       = Vec::with_capacity(self.block_sizes.len());
        let mut transitions  = Vec::with_capacity(self.block_sizes.len().saturating_sub(1));

        for (i, &num_convs) in self.block_sizes.iter().enumerate() {
            blocks.push(DenseBlock::new(num_convs, num_channels, self.growth_rate, device));
            num_channels += num_convs * self.growth_rate;

            // A transition that halves the channels sits between dense blocks
            if i + 1 != self.block_sizes.len() {
                transitions.push(TransitionBlock::new(num_channels, num_channels / 2, device));
                num_channels /= 2;
            }
        }

        let final_norm = BatchNormConfig::new(num_channels).init(device);
        let pool       = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let mut classifier = LinearConfig::new(num_channels, self.num_classes).init(device);
        classifier.bias = Some(Param::from_tensor(Tensor::zeros([self.num_classes], device)));

        DenseNet {
            stem_conv, stem_norm, stem_pool,
            blocks, transitions,
            final_norm, pool, classifier,
        }
    }
}

#[derive(Module, Debug)]
pub struct DenseNet<B: Backend> {
    pub stem_conv:   Conv2d<B>,
    pub stem_norm:   BatchNorm<B, 2>,
    pub stem_pool:   MaxPool2d,
    pub blocks:      Vec<DenseBlock<B>>,
    pub transitions: Vec<TransitionBlock<B>>,
    pub final_norm:  BatchNorm<B, 2>,
    pub pool:        AdaptiveAvgPool2d,
    pub classifier:  Linear<B>,
}

impl<B: Backend> DenseNet<B> {
    /// Feature extractor: [N, 3, H, W] → [N, C, H/32, W/32]
    pub fn features(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.stem_conv.forward(images);
        let x = relu(self.stem_norm.forward(x));
        let mut x = self.stem_pool.forward(x);

        for (i, block) in self.blocks.iter().enumerate() {
            x = block.forward(x);
            if let Some(transition) = self.transitions.get(i) {
                x = transition.forward(x);
            }
        }
        self.final_norm.forward(x)
    }

    /// images: [N, 3, H, W] → logits: [N, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.features(images));
        let x = self.pool.forward(x);           // [N, C, 1, 1]
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);
        self.classifier.forward(x)
    }

    /// Mean cross-entropy over the batch (NLL of log-softmax) and the logits.
    pub fn forward_loss(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), labels);
        (loss, logits)
    }
}
